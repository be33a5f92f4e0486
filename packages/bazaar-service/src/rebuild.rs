use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use bazaar_storage::models::IndexState;

use crate::{BazaarService, Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub rebuilt_count: u64,
	pub orphan_count: u64,
	pub error_count: u64,
}

impl BazaarService {
	/// Re-derives every embedding from the record store, then deletes index entries whose listing
	/// no longer exists. Running it twice leaves the index unchanged.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let mut report = RebuildReport::default();

		for listing_id in self.records.list_listing_ids().await? {
			let _guard = self.locks.acquire(listing_id).await;
			let listing = match self.records.fetch_listing(listing_id).await {
				Ok(Some(listing)) => listing,
				Ok(None) => continue,
				Err(err) => {
					tracing::warn!(error = %err, listing_id = %listing_id, "Rebuild read failed.");

					report.error_count += 1;

					continue;
				},
			};

			match self.sync_index(&listing).await.state {
				IndexState::Synced => report.rebuilt_count += 1,
				_ => report.error_count += 1,
			}
		}

		// Index identifiers are read before live identifiers so a concurrent create, which writes
		// its record first, is never mistaken for an orphan.
		let indexed = self.index.list_ids().await.map_err(Error::index)?;
		let live = self.records.list_listing_ids().await?.into_iter().collect::<HashSet<_>>();

		for listing_id in indexed.into_iter().filter(|id| !live.contains(id)) {
			let _guard = self.locks.acquire(listing_id).await;

			if matches!(self.records.fetch_listing(listing_id).await, Ok(Some(_))) {
				continue;
			}

			match self.index.delete(listing_id).await {
				Ok(()) => {
					tracing::info!(listing_id = %listing_id, "Removed orphaned index entry.");

					report.orphan_count += 1;
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						listing_id = %listing_id,
						"Failed to remove orphaned index entry."
					);

					report.error_count += 1;
				},
			}
		}

		tracing::info!(
			rebuilt_count = report.rebuilt_count,
			orphan_count = report.orphan_count,
			error_count = report.error_count,
			"Index rebuild finished."
		);

		Ok(report)
	}
}
