use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_domain::{Category, Condition};
use bazaar_storage::models::{IndexState, Listing, NewListing};

use crate::{BazaarService, Error, ListingOp, Result};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 5_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateListingRequest {
	pub owner_id: String,
	pub title: String,
	#[serde(default)]
	pub description: String,
	pub category: Category,
	pub condition: Condition,
	pub price_cents: i64,
	#[serde(default)]
	pub original_price_cents: Option<i64>,
	#[serde(default)]
	pub brand: Option<String>,
	#[serde(default)]
	pub age_months: i32,
	#[serde(default)]
	pub negotiable: bool,
	pub campus: String,
	#[serde(default)]
	pub address: Option<String>,
	pub delivery_option: String,
	#[serde(default)]
	pub reason_for_sale: Option<String>,
	#[serde(default)]
	pub image: Option<Vec<u8>>,
}
impl CreateListingRequest {
	fn into_new_listing(self) -> NewListing {
		NewListing {
			owner_id: self.owner_id.trim().to_string(),
			title: self.title.trim().to_string(),
			description: self.description.trim().to_string(),
			category: self.category,
			condition: self.condition,
			price_cents: self.price_cents,
			original_price_cents: self.original_price_cents,
			brand: non_blank(self.brand),
			age_months: self.age_months,
			negotiable: self.negotiable,
			campus: self.campus.trim().to_string(),
			address: non_blank(self.address),
			delivery_option: self.delivery_option.trim().to_string(),
			reason_for_sale: non_blank(self.reason_for_sale),
			image: self.image.filter(|bytes| !bytes.is_empty()),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateListingResponse {
	pub listing_id: Uuid,
	pub op: ListingOp,
	pub index_state: IndexState,
	/// Present when the record was stored but the index step failed.
	pub warning: Option<String>,
}

impl BazaarService {
	/// Stores the record first, then indexes it. An index failure never rolls the record back.
	pub async fn create_listing(&self, req: CreateListingRequest) -> Result<CreateListingResponse> {
		let new_listing = req.into_new_listing();

		if new_listing.owner_id.is_empty() {
			return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() });
		}

		FieldCheck::from(&new_listing).validate()?;

		let listing = self.records.insert_listing(&new_listing).await?;
		let _guard = self.locks.acquire(listing.listing_id).await;
		let sync = self.sync_index(&listing).await;

		tracing::info!(
			listing_id = %listing.listing_id,
			index_state = sync.state.as_str(),
			"Listing created."
		);

		Ok(CreateListingResponse {
			listing_id: listing.listing_id,
			op: ListingOp::Create,
			index_state: sync.state,
			warning: sync.warning,
		})
	}
}

/// Field rules shared by create and update.
pub(crate) struct FieldCheck<'a> {
	title: &'a str,
	description: &'a str,
	price_cents: i64,
	original_price_cents: Option<i64>,
	age_months: i32,
	campus: &'a str,
	delivery_option: &'a str,
}
impl FieldCheck<'_> {
	pub(crate) fn validate(&self) -> Result<()> {
		if self.title.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "title must be non-empty.".to_string() });
		}
		if self.title.chars().count() > MAX_TITLE_CHARS {
			return Err(Error::InvalidRequest {
				message: format!("title must be at most {MAX_TITLE_CHARS} characters."),
			});
		}
		if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
			return Err(Error::InvalidRequest {
				message: format!("description must be at most {MAX_DESCRIPTION_CHARS} characters."),
			});
		}
		if self.price_cents < 0 {
			return Err(Error::InvalidRequest {
				message: "price_cents must be zero or greater.".to_string(),
			});
		}
		if self.original_price_cents.is_some_and(|cents| cents < 0) {
			return Err(Error::InvalidRequest {
				message: "original_price_cents must be zero or greater.".to_string(),
			});
		}
		if self.age_months < 0 {
			return Err(Error::InvalidRequest {
				message: "age_months must be zero or greater.".to_string(),
			});
		}
		if self.campus.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "campus must be non-empty.".to_string() });
		}
		if self.delivery_option.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "delivery_option must be non-empty.".to_string(),
			});
		}

		Ok(())
	}
}
impl<'a> From<&'a NewListing> for FieldCheck<'a> {
	fn from(listing: &'a NewListing) -> Self {
		Self {
			title: &listing.title,
			description: &listing.description,
			price_cents: listing.price_cents,
			original_price_cents: listing.original_price_cents,
			age_months: listing.age_months,
			campus: &listing.campus,
			delivery_option: &listing.delivery_option,
		}
	}
}
impl<'a> From<&'a Listing> for FieldCheck<'a> {
	fn from(listing: &'a Listing) -> Self {
		Self {
			title: &listing.title,
			description: &listing.description,
			price_cents: listing.price_cents,
			original_price_cents: listing.original_price_cents,
			age_months: listing.age_months,
			campus: &listing.campus,
			delivery_option: &listing.delivery_option,
		}
	}
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
