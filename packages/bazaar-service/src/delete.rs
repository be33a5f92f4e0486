use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BazaarService, Error, ListingOp, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteListingRequest {
	pub listing_id: Uuid,
	pub requester_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteListingResponse {
	pub listing_id: Uuid,
	pub op: ListingOp,
}

impl BazaarService {
	/// Deletes the record, then its index entry. A failed index delete leaves an orphan that the
	/// repair cycle removes.
	pub async fn delete_listing(&self, req: DeleteListingRequest) -> Result<DeleteListingResponse> {
		let requester = req.requester_id.trim();

		if requester.is_empty() {
			return Err(Error::InvalidRequest { message: "requester_id is required.".to_string() });
		}

		let _guard = self.locks.acquire(req.listing_id).await;
		let listing = self.records.fetch_listing(req.listing_id).await?.ok_or_else(|| {
			Error::NotFound { message: format!("Listing {} does not exist.", req.listing_id) }
		})?;

		if listing.owner_id != requester {
			return Err(Error::PermissionDenied {
				message: "Only the owner may delete this listing.".to_string(),
			});
		}
		if !self.records.delete_listing(listing.listing_id).await? {
			return Err(Error::NotFound {
				message: format!("Listing {} does not exist.", listing.listing_id),
			});
		}

		if let Err(err) = self.index.delete(listing.listing_id).await {
			tracing::warn!(
				error = %err,
				listing_id = %listing.listing_id,
				"Index delete failed; orphan left for the repair cycle."
			);
		}

		tracing::info!(listing_id = %listing.listing_id, "Listing deleted.");

		Ok(DeleteListingResponse { listing_id: listing.listing_id, op: ListingOp::Delete })
	}
}
