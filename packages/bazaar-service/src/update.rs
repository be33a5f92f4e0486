use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use bazaar_domain::{Category, Condition};
use bazaar_storage::models::{IndexState, Listing};

use crate::{
	BazaarService, Error, ListingOp, Result,
	create::{FieldCheck, non_blank},
};

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Fields to change. Absent fields keep their value; a blank optional text field clears it, and
/// `original_price_cents: null` clears the original price.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingPatch {
	pub title: Option<String>,
	pub description: Option<String>,
	pub category: Option<Category>,
	pub condition: Option<Condition>,
	pub price_cents: Option<i64>,
	#[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub original_price_cents: Option<Option<i64>>,
	pub brand: Option<String>,
	pub age_months: Option<i32>,
	pub negotiable: Option<bool>,
	pub campus: Option<String>,
	pub address: Option<String>,
	pub delivery_option: Option<String>,
	pub reason_for_sale: Option<String>,
	pub image: Option<Vec<u8>>,
}
impl ListingPatch {
	fn apply(self, listing: &mut Listing) {
		if let Some(title) = self.title {
			listing.title = title.trim().to_string();
		}
		if let Some(description) = self.description {
			listing.description = description.trim().to_string();
		}
		if let Some(category) = self.category {
			listing.category = category;
		}
		if let Some(condition) = self.condition {
			listing.condition = condition;
		}
		if let Some(price_cents) = self.price_cents {
			listing.price_cents = price_cents;
		}
		if let Some(original_price_cents) = self.original_price_cents {
			listing.original_price_cents = original_price_cents;
		}
		if self.brand.is_some() {
			listing.brand = non_blank(self.brand);
		}
		if let Some(age_months) = self.age_months {
			listing.age_months = age_months;
		}
		if let Some(negotiable) = self.negotiable {
			listing.negotiable = negotiable;
		}
		if let Some(campus) = self.campus {
			listing.campus = campus.trim().to_string();
		}
		if self.address.is_some() {
			listing.address = non_blank(self.address);
		}
		if let Some(delivery_option) = self.delivery_option {
			listing.delivery_option = delivery_option.trim().to_string();
		}
		if self.reason_for_sale.is_some() {
			listing.reason_for_sale = non_blank(self.reason_for_sale);
		}
		if let Some(image) = self.image {
			listing.image = Some(image).filter(|bytes| !bytes.is_empty());
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateListingRequest {
	pub listing_id: Uuid,
	pub requester_id: String,
	#[serde(default)]
	pub fields: ListingPatch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateListingResponse {
	pub listing_id: Uuid,
	pub op: ListingOp,
	/// Whether the embedding was regenerated.
	pub reindexed: bool,
	pub index_state: IndexState,
	pub warning: Option<String>,
}

impl BazaarService {
	/// Updates a listing on behalf of its owner.
	///
	/// The embedding is regenerated only when a text-bearing field changed. Price and other
	/// metadata edits leave the denormalized index payload until the next repair cycle.
	pub async fn update_listing(&self, req: UpdateListingRequest) -> Result<UpdateListingResponse> {
		let requester = req.requester_id.trim();

		if requester.is_empty() {
			return Err(Error::InvalidRequest { message: "requester_id is required.".to_string() });
		}

		let _guard = self.locks.acquire(req.listing_id).await;
		let mut attempts = 0;
		let (stored, text_changed) = loop {
			attempts += 1;

			let current = self.records.fetch_listing(req.listing_id).await?.ok_or_else(|| {
				Error::NotFound { message: format!("Listing {} does not exist.", req.listing_id) }
			})?;

			if current.owner_id != requester {
				return Err(Error::PermissionDenied {
					message: "Only the owner may update this listing.".to_string(),
				});
			}

			let mut next = current.clone();

			req.fields.clone().apply(&mut next);

			FieldCheck::from(&next).validate()?;

			if next == current {
				return Ok(UpdateListingResponse {
					listing_id: current.listing_id,
					op: ListingOp::None,
					reindexed: false,
					index_state: current.index_state,
					warning: None,
				});
			}

			let text_changed = next.text().differs_from(&current.text());

			// Another process may write the same row between the read and the write.
			match self.records.update_listing(&next).await {
				Ok(stored) => break (stored, text_changed),
				Err(bazaar_storage::Error::Conflict(message)) if attempts < MAX_WRITE_ATTEMPTS => {
					tracing::debug!(
						listing_id = %req.listing_id,
						attempts,
						error = %message,
						"Listing changed before the write; retrying."
					);
				},
				Err(err) => return Err(err.into()),
			}
		};

		if !text_changed {
			tracing::info!(listing_id = %stored.listing_id, "Listing updated without reindex.");

			return Ok(UpdateListingResponse {
				listing_id: stored.listing_id,
				op: ListingOp::Update,
				reindexed: false,
				index_state: stored.index_state,
				warning: None,
			});
		}

		let sync = self.sync_index(&stored).await;

		tracing::info!(
			listing_id = %stored.listing_id,
			index_state = sync.state.as_str(),
			"Listing updated and reindexed."
		);

		Ok(UpdateListingResponse {
			listing_id: stored.listing_id,
			op: ListingOp::Update,
			reindexed: true,
			index_state: sync.state,
			warning: sync.warning,
		})
	}
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	T::deserialize(deserializer).map(Some)
}
