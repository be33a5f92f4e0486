pub mod db;
pub mod models;
pub mod qdrant;
pub mod queries;
pub mod schema;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

use uuid::Uuid;

use crate::models::{IndexEntry, IndexHit, IndexState, Listing, NewListing};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authoritative listing records.
pub trait RecordStore
where
	Self: Send + Sync,
{
	/// Inserts a listing and returns it with its store-assigned identifier.
	fn insert_listing<'a>(&'a self, listing: &'a NewListing) -> BoxFuture<'a, Result<Listing>>;

	fn fetch_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<Option<Listing>>>;

	/// Missing identifiers are absent from the result. Order is unspecified.
	fn fetch_listings<'a>(
		&'a self,
		listing_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<Listing>>>;

	/// Writes only when the stored revision still equals `listing.revision`, bumping it. Fails with
	/// [`Error::Conflict`] when the listing was removed or rewritten since it was read.
	fn update_listing<'a>(&'a self, listing: &'a Listing) -> BoxFuture<'a, Result<Listing>>;

	/// Returns whether a row was removed.
	fn delete_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<bool>>;

	/// Newest first.
	fn list_by_owner<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<Listing>>>;

	fn list_listing_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>>;

	/// Compare-and-set on `revision`. Returns `false`, changing nothing, when the listing was
	/// removed or rewritten after that revision was read.
	fn set_index_state<'a>(
		&'a self,
		listing_id: Uuid,
		revision: i64,
		state: IndexState,
		error: Option<&'a str>,
	) -> BoxFuture<'a, Result<bool>>;

	/// Unconditionally marks the listing `DIVERGENT`. A no-op when it no longer exists.
	fn mark_divergent<'a>(&'a self, listing_id: Uuid, error: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Similarity index keyed by listing identifier. Derived from the record store.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Inserts or replaces the point for `entry.listing_id`.
	fn upsert<'a>(&'a self, entry: &'a IndexEntry) -> BoxFuture<'a, Result<()>>;

	/// Deleting an absent identifier succeeds.
	fn delete<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<()>>;

	/// Nearest neighbours, most similar first.
	fn query<'a>(&'a self, vector: &'a [f32], limit: u64) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	fn list_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>>;
}
