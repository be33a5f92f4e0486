use std::collections::HashMap;

use bazaar_domain::StructuredQuery;
use bazaar_storage::models::Listing;

use crate::{BazaarService, Error, Result};

/// A hydrated listing in index order. `rank` starts at 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub listing: Listing,
	pub rank: u32,
	pub score: f32,
}

impl BazaarService {
	/// Returns up to `k` nearest listings for the item title. An empty result is not an error.
	pub async fn retrieve(&self, query: &StructuredQuery, k: Option<u32>) -> Result<Vec<Candidate>> {
		let k = self.clamp_k(k);
		let vector = self.embed_one(&query.item_title).await?;
		let hits = self.index.query(&vector, u64::from(k)).await.map_err(Error::index)?;

		if hits.is_empty() {
			tracing::info!(k, "Retrieval returned no identifiers.");

			return Ok(Vec::new());
		}

		let ids = hits.iter().map(|hit| hit.listing_id).collect::<Vec<_>>();
		let mut by_id = self
			.records
			.fetch_listings(&ids)
			.await?
			.into_iter()
			.map(|listing| (listing.listing_id, listing))
			.collect::<HashMap<_, _>>();
		let mut candidates = Vec::with_capacity(hits.len());

		for hit in hits {
			let Some(listing) = by_id.remove(&hit.listing_id) else {
				tracing::debug!(listing_id = %hit.listing_id, "Dropping orphaned index hit.");

				continue;
			};
			let rank = candidates.len() as u32 + 1;

			candidates.push(Candidate { listing, rank, score: hit.score });
		}

		tracing::info!(k, candidates = candidates.len(), "Retrieval finished.");

		Ok(candidates)
	}

	fn clamp_k(&self, k: Option<u32>) -> u32 {
		let cfg = &self.cfg.search;

		k.unwrap_or(cfg.default_k).clamp(1, cfg.max_k.max(1))
	}
}
