use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{IndexState, Listing, NewListing},
};

const LISTING_COLUMNS: &str = "\
listing_id,
	owner_id,
	title,
	description,
	category,
	condition,
	price_cents,
	original_price_cents,
	brand,
	age_months,
	negotiable,
	campus,
	address,
	delivery_option,
	reason_for_sale,
	image,
	revision,
	index_state,
	index_error,
	indexed_at,
	created_at,
	updated_at";

pub async fn insert_listing<'e, E>(executor: E, listing: &NewListing) -> Result<Listing>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO listings (
	owner_id,
	title,
	description,
	category,
	condition,
	price_cents,
	original_price_cents,
	brand,
	age_months,
	negotiable,
	campus,
	address,
	delivery_option,
	reason_for_sale,
	image,
	index_state
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 'PENDING')
RETURNING {LISTING_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Listing>(&sql)
		.bind(listing.owner_id.as_str())
		.bind(listing.title.as_str())
		.bind(listing.description.as_str())
		.bind(listing.category.as_str())
		.bind(listing.condition.as_str())
		.bind(listing.price_cents)
		.bind(listing.original_price_cents)
		.bind(listing.brand.as_deref())
		.bind(listing.age_months)
		.bind(listing.negotiable)
		.bind(listing.campus.as_str())
		.bind(listing.address.as_deref())
		.bind(listing.delivery_option.as_str())
		.bind(listing.reason_for_sale.as_deref())
		.bind(listing.image.as_deref())
		.fetch_one(executor)
		.await?;

	Ok(row)
}

pub async fn fetch_listing<'e, E>(executor: E, listing_id: Uuid) -> Result<Option<Listing>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {LISTING_COLUMNS}\nFROM listings\nWHERE listing_id = $1");
	let row = sqlx::query_as::<_, Listing>(&sql).bind(listing_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn fetch_listings<'e, E>(executor: E, listing_ids: &[Uuid]) -> Result<Vec<Listing>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {LISTING_COLUMNS}\nFROM listings\nWHERE listing_id = ANY($1)");
	let rows = sqlx::query_as::<_, Listing>(&sql).bind(listing_ids).fetch_all(executor).await?;

	Ok(rows)
}

/// Writes every editable field if `listing.revision` is still current. Identifier, owner, and
/// creation time never change.
pub async fn update_listing<'e, E>(executor: E, listing: &Listing) -> Result<Listing>
where
	E: PgExecutor<'e>,
{
	let now = OffsetDateTime::now_utc();
	let sql = format!(
		"\
UPDATE listings
SET
	title = $2,
	description = $3,
	category = $4,
	condition = $5,
	price_cents = $6,
	original_price_cents = $7,
	brand = $8,
	age_months = $9,
	negotiable = $10,
	campus = $11,
	address = $12,
	delivery_option = $13,
	reason_for_sale = $14,
	image = $15,
	revision = revision + 1,
	updated_at = $16
WHERE listing_id = $1
	AND revision = $17
RETURNING {LISTING_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Listing>(&sql)
		.bind(listing.listing_id)
		.bind(listing.title.as_str())
		.bind(listing.description.as_str())
		.bind(listing.category.as_str())
		.bind(listing.condition.as_str())
		.bind(listing.price_cents)
		.bind(listing.original_price_cents)
		.bind(listing.brand.as_deref())
		.bind(listing.age_months)
		.bind(listing.negotiable)
		.bind(listing.campus.as_str())
		.bind(listing.address.as_deref())
		.bind(listing.delivery_option.as_str())
		.bind(listing.reason_for_sale.as_deref())
		.bind(listing.image.as_deref())
		.bind(now)
		.bind(listing.revision)
		.fetch_optional(executor)
		.await?;

	row.ok_or_else(|| {
		Error::Conflict(format!(
			"listing {} is gone or past revision {}",
			listing.listing_id, listing.revision
		))
	})
}

pub async fn delete_listing<'e, E>(executor: E, listing_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM listings WHERE listing_id = $1")
		.bind(listing_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn list_by_owner<'e, E>(executor: E, owner_id: &str) -> Result<Vec<Listing>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {LISTING_COLUMNS}\nFROM listings\nWHERE owner_id = $1\nORDER BY created_at DESC"
	);
	let rows = sqlx::query_as::<_, Listing>(&sql).bind(owner_id).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn list_listing_ids<'e, E>(executor: E) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let ids = sqlx::query_scalar("SELECT listing_id FROM listings ORDER BY listing_id")
		.fetch_all(executor)
		.await?;

	Ok(ids)
}

/// Records the index outcome for `revision`. Returns `false` when the row was removed or written
/// since that revision was read, in which case nothing changes.
pub async fn set_index_state<'e, E>(
	executor: E,
	listing_id: Uuid,
	revision: i64,
	state: IndexState,
	error: Option<&str>,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let indexed_at = (state == IndexState::Synced).then(OffsetDateTime::now_utc);
	let result = sqlx::query(
		"\
UPDATE listings
SET
	index_state = $3,
	index_error = $4,
	indexed_at = COALESCE($5, indexed_at)
WHERE listing_id = $1
	AND revision = $2",
	)
	.bind(listing_id)
	.bind(revision)
	.bind(state.as_str())
	.bind(error)
	.bind(indexed_at)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Flags a listing for repair regardless of its revision.
pub async fn mark_divergent<'e, E>(executor: E, listing_id: Uuid, error: &str) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"UPDATE listings SET index_state = 'DIVERGENT', index_error = $2 WHERE listing_id = $1",
	)
	.bind(listing_id)
	.bind(error)
	.execute(executor)
	.await?;

	Ok(())
}
