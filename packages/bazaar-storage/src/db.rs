use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use crate::{
	BoxFuture, RecordStore, Result,
	models::{IndexState, Listing, NewListing},
	queries, schema,
};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &bazaar_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 4_120_337;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
impl RecordStore for Db {
	fn insert_listing<'a>(&'a self, listing: &'a NewListing) -> BoxFuture<'a, Result<Listing>> {
		Box::pin(queries::insert_listing(&self.pool, listing))
	}

	fn fetch_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<Option<Listing>>> {
		Box::pin(queries::fetch_listing(&self.pool, listing_id))
	}

	fn fetch_listings<'a>(
		&'a self,
		listing_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<Listing>>> {
		Box::pin(queries::fetch_listings(&self.pool, listing_ids))
	}

	fn update_listing<'a>(&'a self, listing: &'a Listing) -> BoxFuture<'a, Result<Listing>> {
		Box::pin(queries::update_listing(&self.pool, listing))
	}

	fn delete_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queries::delete_listing(&self.pool, listing_id))
	}

	fn list_by_owner<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<Listing>>> {
		Box::pin(queries::list_by_owner(&self.pool, owner_id))
	}

	fn list_listing_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(queries::list_listing_ids(&self.pool))
	}

	fn set_index_state<'a>(
		&'a self,
		listing_id: Uuid,
		revision: i64,
		state: IndexState,
		error: Option<&'a str>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queries::set_index_state(&self.pool, listing_id, revision, state, error))
	}

	fn mark_divergent<'a>(&'a self, listing_id: Uuid, error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::mark_divergent(&self.pool, listing_id, error))
	}
}
