pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Permission denied: {message}")]
	PermissionDenied { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
	#[error("Shape mismatch: {message}")]
	ShapeMismatch { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
}
impl Error {
	/// Maps a failure from the vector index, whatever the underlying store reports.
	pub(crate) fn index(err: bazaar_storage::Error) -> Self {
		Self::Index { message: err.to_string() }
	}
}

impl From<bazaar_storage::Error> for Error {
	fn from(err: bazaar_storage::Error) -> Self {
		match err {
			bazaar_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			bazaar_storage::Error::InvalidArgument(message) => Self::Storage { message },
			bazaar_storage::Error::Conflict(message) => Self::Conflict { message },
			bazaar_storage::Error::Qdrant(inner) => Self::Index { message: inner.to_string() },
		}
	}
}

impl From<bazaar_providers::Error> for Error {
	fn from(err: bazaar_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<bazaar_domain::ShapeError> for Error {
	fn from(err: bazaar_domain::ShapeError) -> Self {
		Self::ShapeMismatch { message: err.message }
	}
}
