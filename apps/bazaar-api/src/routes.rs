use axum::{
	Json, Router,
	body::Body,
	extract::{Request, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use bazaar_domain::Qualification;
use bazaar_service::{
	CreateListingRequest, CreateListingResponse, DeleteListingRequest, DeleteListingResponse,
	Error as ServiceError, GetListingRequest, ListListingsRequest, ListListingsResponse,
	ListingItem, RebuildReport, SearchRequest, TurnOutcome, TurnRequest, UpdateListingRequest,
	UpdateListingResponse,
};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct QualifyRequest {
	query: String,
}

/// Bearer token required by a router, if any.
#[derive(Clone)]
struct AuthToken(Option<String>);

pub fn router(state: AppState) -> Router {
	let token = AuthToken(state.service.cfg.security.api_auth_token.clone());

	Router::new()
		.route("/v1/listings/create", post(create_listing))
		.route("/v1/listings/update", post(update_listing))
		.route("/v1/listings/delete", post(delete_listing))
		.route("/v1/listings/get", post(get_listing))
		.route("/v1/listings/list", post(list_listings))
		.route("/v1/search/qualify", post(qualify))
		.route("/v1/search", post(search))
		.route("/v1/search/turn", post(turn))
		.layer(middleware::from_fn_with_state(token, auth_middleware))
		.route("/health", get(health))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	let token = AuthToken(state.service.cfg.security.admin_auth_token.clone());

	Router::new()
		.route("/v1/admin/rebuild_index", post(rebuild_index))
		.layer(middleware::from_fn_with_state(token, auth_middleware))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_listing(
	State(state): State<AppState>,
	Json(payload): Json<CreateListingRequest>,
) -> Result<Json<CreateListingResponse>, ApiError> {
	let response = state.service.create_listing(payload).await?;

	Ok(Json(response))
}

async fn update_listing(
	State(state): State<AppState>,
	Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<UpdateListingResponse>, ApiError> {
	let response = state.service.update_listing(payload).await?;

	Ok(Json(response))
}

async fn delete_listing(
	State(state): State<AppState>,
	Json(payload): Json<DeleteListingRequest>,
) -> Result<Json<DeleteListingResponse>, ApiError> {
	let response = state.service.delete_listing(payload).await?;

	Ok(Json(response))
}

async fn get_listing(
	State(state): State<AppState>,
	Json(payload): Json<GetListingRequest>,
) -> Result<Json<ListingItem>, ApiError> {
	let response = state.service.get_listing(payload).await?;

	Ok(Json(response))
}

async fn list_listings(
	State(state): State<AppState>,
	Json(payload): Json<ListListingsRequest>,
) -> Result<Json<ListListingsResponse>, ApiError> {
	let response = state.service.list_listings(payload).await?;

	Ok(Json(response))
}

async fn qualify(
	State(state): State<AppState>,
	Json(payload): Json<QualifyRequest>,
) -> Result<Json<Qualification>, ApiError> {
	let response = state.service.qualify(&payload.query).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn turn(
	State(state): State<AppState>,
	Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
	let response = state.service.turn(payload).await?;

	Ok(Json(response))
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let response = state.service.rebuild_index().await?;

	Ok(Json(response))
}

async fn auth_middleware(
	State(AuthToken(expected)): State<AuthToken>,
	req: Request<Body>,
	next: Next,
) -> Response {
	let authorized = match expected.as_deref() {
		None => true,
		Some(expected) => read_bearer_token(req.headers()).is_some_and(|token| token == expected),
	};

	if !authorized {
		return ApiError::new(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let token = raw.to_str().ok()?.trim().strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::PermissionDenied { message } =>
				Self::new(StatusCode::FORBIDDEN, "PERMISSION_DENIED", message),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			ServiceError::Conflict { message } =>
				Self::new(StatusCode::CONFLICT, "CONFLICT", message),
			ServiceError::Provider { message }
			| ServiceError::Timeout { message }
			| ServiceError::ShapeMismatch { message } => {
				tracing::error!(error = %message, "Upstream provider failure.");

				Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "Upstream provider failed.")
			},
			ServiceError::Storage { message } | ServiceError::Index { message } => {
				tracing::error!(error = %message, "Storage failure.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal error.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
