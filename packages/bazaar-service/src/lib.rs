pub mod analyze;
pub mod create;
pub mod delete;
pub mod list;
pub mod pipeline;
pub mod qualify;
pub mod rank;
pub mod rebuild;
pub mod retrieve;
pub mod update;

mod error;
mod locks;

pub use analyze::{Analysis, MatchAnalysis};
pub use bazaar_providers::{BoxFuture, EmbeddingProvider, Providers, ReasoningProvider};
pub use create::{CreateListingRequest, CreateListingResponse};
pub use delete::{DeleteListingRequest, DeleteListingResponse};
pub use error::{Error, Result};
pub use list::{GetListingRequest, ListListingsRequest, ListListingsResponse, ListingItem};
pub use pipeline::{PipelineState, SearchRequest, TurnOutcome, TurnRequest};
pub use rank::Recommendation;
pub use rebuild::RebuildReport;
pub use retrieve::Candidate;
pub use update::{ListingPatch, UpdateListingRequest, UpdateListingResponse};

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_config::Config;
use bazaar_storage::{
	RecordStore, VectorIndex,
	models::{IndexState, Listing},
};

use crate::locks::ListingLocks;

const MAX_SYNC_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingOp {
	Create,
	Update,
	Delete,
	None,
}

pub struct BazaarService {
	pub cfg: Config,
	pub records: Arc<dyn RecordStore>,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	locks: ListingLocks,
}
impl BazaarService {
	pub fn new(cfg: Config, records: Arc<dyn RecordStore>, index: Arc<dyn VectorIndex>) -> Self {
		Self::with_providers(cfg, records, index, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		records: Arc<dyn RecordStore>,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		Self { cfg, records, index, providers, locks: ListingLocks::default() }
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_string()];
		let vectors = bounded(
			"embedding",
			cfg.timeout_ms,
			self.providers.embedding.embed(cfg, &texts),
		)
		.await??;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}

	pub(crate) async fn reason(&self, system: &str, prompt: &str) -> Result<String> {
		let cfg = &self.cfg.providers.reasoning;
		let text = bounded(
			"reasoning",
			cfg.timeout_ms,
			self.providers.reasoning.complete(cfg, system, prompt),
		)
		.await??;

		Ok(text)
	}

	/// Brings the index entry for `listing` in line with its current text and records the outcome.
	///
	/// Never fails: an index failure marks the listing `DIVERGENT` and is returned as a warning.
	///
	/// The outcome is recorded with a compare-and-set on the listing revision. When another process
	/// rewrote or removed the record meanwhile, the index step is redone against the latest record.
	pub(crate) async fn sync_index(&self, listing: &Listing) -> IndexSync {
		let listing_id = listing.listing_id;
		let mut current = listing.clone();
		let mut attempts = 0;

		loop {
			attempts += 1;

			let sync = self.write_index(&current).await;
			let recorded = self
				.records
				.set_index_state(listing_id, current.revision, sync.state, sync.warning.as_deref())
				.await;

			match recorded {
				Ok(true) => return sync,
				Ok(false) => {},
				Err(err) => {
					tracing::warn!(
						error = %err,
						listing_id = %listing_id,
						"Failed to record index state."
					);

					return sync;
				},
			}

			let latest = match self.records.fetch_listing(listing_id).await {
				Ok(latest) => latest,
				Err(err) => {
					tracing::warn!(
						error = %err,
						listing_id = %listing_id,
						"Failed to re-read listing after a concurrent write."
					);

					return IndexSync::divergent(err.to_string());
				},
			};
			let Some(latest) = latest else {
				return self.drop_removed_entry(listing_id).await;
			};

			tracing::debug!(
				listing_id = %listing_id,
				read_revision = current.revision,
				latest_revision = latest.revision,
				"Listing changed during the index step; syncing again."
			);

			if attempts >= MAX_SYNC_ATTEMPTS {
				let message = "Listing kept changing during the index step.";

				tracing::warn!(listing_id = %listing_id, attempts, "{message}");

				if let Err(err) = self.records.mark_divergent(listing_id, message).await {
					tracing::warn!(
						error = %err,
						listing_id = %listing_id,
						"Failed to record index state."
					);
				}

				return IndexSync::divergent(message.to_string());
			}

			current = latest;
		}
	}

	async fn write_index(&self, listing: &Listing) -> IndexSync {
		let result = match listing.text().searchable_text() {
			Some(text) => match self.embed_one(&text).await {
				Ok(vector) => {
					let entry = listing.index_entry(vector);

					self.index.upsert(&entry).await.map_err(Error::index)
				},
				Err(err) => Err(err),
			},
			None => self.index.delete(listing.listing_id).await.map_err(Error::index),
		};

		match result {
			Ok(()) => IndexSync::synced(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					listing_id = %listing.listing_id,
					"Index step failed; listing marked divergent."
				);

				IndexSync::divergent(err.to_string())
			},
		}
	}

	/// The record vanished mid-sync. A point written above must not outlive it.
	async fn drop_removed_entry(&self, listing_id: Uuid) -> IndexSync {
		match self.index.delete(listing_id).await {
			Ok(()) => IndexSync::synced(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					listing_id = %listing_id,
					"Failed to drop the entry of a removed listing; orphan left for repair."
				);

				IndexSync::divergent(err.to_string())
			},
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexSync {
	pub(crate) state: IndexState,
	pub(crate) warning: Option<String>,
}
impl IndexSync {
	fn synced() -> Self {
		Self { state: IndexState::Synced, warning: None }
	}

	fn divergent(warning: String) -> Self {
		Self { state: IndexState::Divergent, warning: Some(warning) }
	}
}

async fn bounded<F, T>(label: &str, timeout_ms: u64, fut: F) -> Result<T>
where
	F: Future<Output = T>,
{
	tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await.map_err(|_| {
		Error::Timeout { message: format!("The {label} call exceeded {timeout_ms} ms.") }
	})
}
