use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use bazaar_domain::{Category, Condition, listing::format_price};
use bazaar_storage::models::{IndexState, Listing};

use crate::{BazaarService, Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetListingRequest {
	pub listing_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListListingsRequest {
	pub owner_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListListingsResponse {
	pub items: Vec<ListingItem>,
}

/// Presentation view of a listing. The image payload is reported, not inlined.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingItem {
	pub listing_id: Uuid,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub category: Category,
	pub condition: Condition,
	pub price_cents: i64,
	pub price: String,
	pub original_price_cents: Option<i64>,
	pub brand: Option<String>,
	pub age_months: i32,
	pub negotiable: bool,
	pub campus: String,
	pub address: Option<String>,
	pub delivery_option: String,
	pub reason_for_sale: Option<String>,
	pub has_image: bool,
	pub index_state: IndexState,
	pub index_error: Option<String>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub indexed_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<Listing> for ListingItem {
	fn from(listing: Listing) -> Self {
		Self {
			listing_id: listing.listing_id,
			owner_id: listing.owner_id,
			title: listing.title,
			description: listing.description,
			category: listing.category,
			condition: listing.condition,
			price_cents: listing.price_cents,
			price: format_price(listing.price_cents),
			original_price_cents: listing.original_price_cents,
			brand: listing.brand,
			age_months: listing.age_months,
			negotiable: listing.negotiable,
			campus: listing.campus,
			address: listing.address,
			delivery_option: listing.delivery_option,
			reason_for_sale: listing.reason_for_sale,
			has_image: listing.image.is_some(),
			index_state: listing.index_state,
			index_error: listing.index_error,
			indexed_at: listing.indexed_at,
			created_at: listing.created_at,
			updated_at: listing.updated_at,
		}
	}
}

impl BazaarService {
	pub async fn get_listing(&self, req: GetListingRequest) -> Result<ListingItem> {
		let listing = self.records.fetch_listing(req.listing_id).await?.ok_or_else(|| {
			Error::NotFound { message: format!("Listing {} does not exist.", req.listing_id) }
		})?;

		Ok(listing.into())
	}

	/// The owner's listings, newest first, including divergence flags.
	pub async fn list_listings(&self, req: ListListingsRequest) -> Result<ListListingsResponse> {
		let owner_id = req.owner_id.trim();

		if owner_id.is_empty() {
			return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() });
		}

		let listings = self.records.list_by_owner(owner_id).await?;

		Ok(ListListingsResponse { items: listings.into_iter().map(ListingItem::from).collect() })
	}
}
