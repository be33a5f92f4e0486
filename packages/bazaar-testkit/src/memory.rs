//! In-memory record store and vector index with failure injection.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::{BTreeMap, HashMap},
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use time::OffsetDateTime;
use uuid::Uuid;

use bazaar_storage::{
	BoxFuture, Error, RecordStore, Result, VectorIndex,
	models::{IndexEntry, IndexHit, IndexState, Listing, NewListing},
};

#[derive(Default)]
pub struct MemoryRecordStore {
	rows: Mutex<BTreeMap<Uuid, Listing>>,
	writes: AtomicUsize,
	fail_writes: AtomicBool,
}
impl MemoryRecordStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts, updates, and deletes performed so far.
	pub fn write_count(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}

	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	pub fn snapshot(&self, listing_id: Uuid) -> Option<Listing> {
		self.rows().get(&listing_id).cloned()
	}

	pub fn len(&self) -> usize {
		self.rows().len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows().is_empty()
	}

	fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<Uuid, Listing>> {
		self.rows.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn begin_write(&self) -> Result<()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(Error::InvalidArgument("Injected record store failure.".to_string()));
		}

		self.writes.fetch_add(1, Ordering::SeqCst);

		Ok(())
	}
}
impl RecordStore for MemoryRecordStore {
	fn insert_listing<'a>(&'a self, listing: &'a NewListing) -> BoxFuture<'a, Result<Listing>> {
		Box::pin(async move {
			self.begin_write()?;

			let now = OffsetDateTime::now_utc();
			let row = Listing {
				listing_id: Uuid::new_v4(),
				owner_id: listing.owner_id.clone(),
				title: listing.title.clone(),
				description: listing.description.clone(),
				category: listing.category,
				condition: listing.condition,
				price_cents: listing.price_cents,
				original_price_cents: listing.original_price_cents,
				brand: listing.brand.clone(),
				age_months: listing.age_months,
				negotiable: listing.negotiable,
				campus: listing.campus.clone(),
				address: listing.address.clone(),
				delivery_option: listing.delivery_option.clone(),
				reason_for_sale: listing.reason_for_sale.clone(),
				image: listing.image.clone(),
				revision: 1,
				index_state: IndexState::Pending,
				index_error: None,
				indexed_at: None,
				created_at: now,
				updated_at: now,
			};

			self.rows().insert(row.listing_id, row.clone());

			Ok(row)
		})
	}

	fn fetch_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<Option<Listing>>> {
		Box::pin(async move { Ok(self.snapshot(listing_id)) })
	}

	fn fetch_listings<'a>(
		&'a self,
		listing_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<Listing>>> {
		Box::pin(async move {
			let rows = self.rows();

			Ok(listing_ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
		})
	}

	fn update_listing<'a>(&'a self, listing: &'a Listing) -> BoxFuture<'a, Result<Listing>> {
		Box::pin(async move {
			self.begin_write()?;

			let mut rows = self.rows();
			let Some(current) =
				rows.get_mut(&listing.listing_id).filter(|row| row.revision == listing.revision)
			else {
				return Err(Error::Conflict(format!(
					"listing {} is gone or past revision {}",
					listing.listing_id, listing.revision
				)));
			};
			let mut updated = listing.clone();

			updated.owner_id = current.owner_id.clone();
			updated.revision = current.revision + 1;
			updated.created_at = current.created_at;
			updated.index_state = current.index_state;
			updated.index_error = current.index_error.clone();
			updated.indexed_at = current.indexed_at;
			updated.updated_at = OffsetDateTime::now_utc();
			*current = updated.clone();

			Ok(updated)
		})
	}

	fn delete_listing<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			self.begin_write()?;

			Ok(self.rows().remove(&listing_id).is_some())
		})
	}

	fn list_by_owner<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<Listing>>> {
		Box::pin(async move {
			let mut owned = self
				.rows()
				.values()
				.filter(|listing| listing.owner_id == owner_id)
				.cloned()
				.collect::<Vec<_>>();

			owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

			Ok(owned)
		})
	}

	fn list_listing_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move { Ok(self.rows().keys().copied().collect()) })
	}

	fn set_index_state<'a>(
		&'a self,
		listing_id: Uuid,
		revision: i64,
		state: IndexState,
		error: Option<&'a str>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut rows = self.rows();
			let Some(row) = rows.get_mut(&listing_id).filter(|row| row.revision == revision) else {
				return Ok(false);
			};

			row.index_state = state;
			row.index_error = error.map(str::to_string);

			if state == IndexState::Synced {
				row.indexed_at = Some(OffsetDateTime::now_utc());
			}

			Ok(true)
		})
	}

	fn mark_divergent<'a>(&'a self, listing_id: Uuid, error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if let Some(row) = self.rows().get_mut(&listing_id) {
				row.index_state = IndexState::Divergent;
				row.index_error = Some(error.to_string());
			}

			Ok(())
		})
	}
}

#[derive(Default)]
pub struct MemoryVectorIndex {
	points: Mutex<HashMap<Uuid, IndexEntry>>,
	upserts: AtomicUsize,
	fail_upserts: AtomicBool,
	fail_deletes: AtomicBool,
	fail_queries: AtomicBool,
}
impl MemoryVectorIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_upserts(&self, fail: bool) {
		self.fail_upserts.store(fail, Ordering::SeqCst);
	}

	pub fn fail_deletes(&self, fail: bool) {
		self.fail_deletes.store(fail, Ordering::SeqCst);
	}

	pub fn fail_queries(&self, fail: bool) {
		self.fail_queries.store(fail, Ordering::SeqCst);
	}

	/// Successful upserts performed so far.
	pub fn upsert_count(&self) -> usize {
		self.upserts.load(Ordering::SeqCst)
	}

	pub fn entry(&self, listing_id: Uuid) -> Option<IndexEntry> {
		self.points().get(&listing_id).cloned()
	}

	pub fn contains(&self, listing_id: Uuid) -> bool {
		self.points().contains_key(&listing_id)
	}

	pub fn len(&self) -> usize {
		self.points().len()
	}

	pub fn is_empty(&self) -> bool {
		self.points().is_empty()
	}

	fn points(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, IndexEntry>> {
		self.points.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl VectorIndex for MemoryVectorIndex {
	fn upsert<'a>(&'a self, entry: &'a IndexEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if self.fail_upserts.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Injected index upsert failure.".to_string()));
			}

			self.points().insert(entry.listing_id, entry.clone());
			self.upserts.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if self.fail_deletes.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Injected index delete failure.".to_string()));
			}

			self.points().remove(&listing_id);

			Ok(())
		})
	}

	fn query<'a>(&'a self, vector: &'a [f32], limit: u64) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move {
			if self.fail_queries.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Injected index query failure.".to_string()));
			}

			let mut hits = self
				.points()
				.values()
				.map(|entry| IndexHit {
					listing_id: entry.listing_id,
					score: cosine_similarity(vector, &entry.vector).unwrap_or(0.0),
				})
				.collect::<Vec<_>>();

			hits.sort_by(|a, b| {
				b.score
					.partial_cmp(&a.score)
					.unwrap_or(CmpOrdering::Equal)
					.then_with(|| a.listing_id.cmp(&b.listing_id))
			});
			hits.truncate(limit as usize);

			Ok(hits)
		})
	}

	fn list_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let mut ids = self.points().keys().copied().collect::<Vec<_>>();

			ids.sort();

			Ok(ids)
		})
	}
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.len() != b.len() || a.is_empty() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	let denom = norm_a.sqrt() * norm_b.sqrt();

	if denom <= f32::EPSILON { None } else { Some(dot / denom) }
}
