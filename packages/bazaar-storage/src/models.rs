use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use bazaar_domain::{Category, Condition, ListingText};

use crate::Error;

/// Whether a listing's embedding is known to match its current text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexState {
	Pending,
	Synced,
	Divergent,
}
impl IndexState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Synced => "SYNCED",
			Self::Divergent => "DIVERGENT",
		}
	}
}
impl TryFrom<String> for IndexState {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		match raw.as_str() {
			"PENDING" => Ok(Self::Pending),
			"SYNCED" => Ok(Self::Synced),
			"DIVERGENT" => Ok(Self::Divergent),
			_ => Err(Error::InvalidArgument(format!("Unknown index state {raw:?}."))),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Listing {
	pub listing_id: Uuid,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	#[sqlx(try_from = "String")]
	pub category: Category,
	#[sqlx(try_from = "String")]
	pub condition: Condition,
	pub price_cents: i64,
	pub original_price_cents: Option<i64>,
	pub brand: Option<String>,
	pub age_months: i32,
	pub negotiable: bool,
	pub campus: String,
	pub address: Option<String>,
	pub delivery_option: String,
	pub reason_for_sale: Option<String>,
	pub image: Option<Vec<u8>>,
	/// Bumped by every record write. Index state is only recorded against the revision that was
	/// embedded.
	pub revision: i64,
	#[sqlx(try_from = "String")]
	pub index_state: IndexState,
	pub index_error: Option<String>,
	pub indexed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl Listing {
	pub fn text(&self) -> ListingText<'_> {
		ListingText {
			title: &self.title,
			description: &self.description,
			brand: self.brand.as_deref(),
			category: self.category,
		}
	}

	/// Payload stored next to the vector.
	pub fn index_entry(&self, vector: Vec<f32>) -> IndexEntry {
		IndexEntry {
			listing_id: self.listing_id,
			vector,
			title: self.title.clone(),
			category: self.category,
			price_cents: self.price_cents,
		}
	}
}

/// A listing before the record store has assigned its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub category: Category,
	pub condition: Condition,
	pub price_cents: i64,
	pub original_price_cents: Option<i64>,
	pub brand: Option<String>,
	pub age_months: i32,
	pub negotiable: bool,
	pub campus: String,
	pub address: Option<String>,
	pub delivery_option: String,
	pub reason_for_sale: Option<String>,
	pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
	pub listing_id: Uuid,
	pub vector: Vec<f32>,
	pub title: String,
	pub category: Category,
	pub price_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
	pub listing_id: Uuid,
	pub score: f32,
}
