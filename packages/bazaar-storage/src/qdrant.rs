use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{
		CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct,
		PointsIdsList, Query, QueryPointsBuilder, ScrollPointsBuilder, UpsertPointsBuilder, Value,
		VectorParamsBuilder, point_id::PointIdOptions,
	},
};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, Result, VectorIndex,
	models::{IndexEntry, IndexHit},
};

const SCROLL_PAGE_SIZE: u32 = 256;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &bazaar_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection with one cosine dense vector per point when it does not exist yet.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let builder = CreateCollectionBuilder::new(self.collection.clone())
			.vectors_config(VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine));

		self.client.create_collection(builder).await?;

		Ok(())
	}

	async fn upsert_entry(&self, entry: &IndexEntry) -> Result<()> {
		if entry.vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector for listing {} has {} dimensions; expected {}.",
				entry.listing_id,
				entry.vector.len(),
				self.vector_dim
			)));
		}

		let mut payload_map = HashMap::new();

		payload_map.insert("listing_id".to_string(), Value::from(entry.listing_id.to_string()));
		payload_map.insert("title".to_string(), Value::from(entry.title.clone()));
		payload_map.insert("category".to_string(), Value::from(entry.category.as_str()));
		payload_map.insert("price_cents".to_string(), Value::from(entry.price_cents));

		let payload = Payload::from(payload_map);
		let point = PointStruct::new(entry.listing_id.to_string(), entry.vector.clone(), payload);
		let upsert = UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	async fn delete_point(&self, listing_id: Uuid) -> Result<()> {
		let ids = PointsIdsList { ids: vec![PointId::from(listing_id.to_string())] };
		let delete = DeletePointsBuilder::new(self.collection.clone()).points(ids).wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	async fn query_nearest(&self, vector: &[f32], limit: u64) -> Result<Vec<IndexHit>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.limit(limit)
			.with_payload(false);
		let response = self.client.query(search).await?;
		let mut hits = Vec::with_capacity(response.result.len());

		for point in response.result {
			let Some(listing_id) = point.id.as_ref().and_then(point_uuid) else {
				continue;
			};

			hits.push(IndexHit { listing_id, score: point.score });
		}

		Ok(hits)
	}

	async fn scroll_ids(&self) -> Result<Vec<Uuid>> {
		let mut ids = Vec::new();
		let mut offset: Option<PointId> = None;

		loop {
			let mut scroll = ScrollPointsBuilder::new(self.collection.clone())
				.limit(SCROLL_PAGE_SIZE)
				.with_payload(false)
				.with_vectors(false);

			if let Some(offset) = offset.take() {
				scroll = scroll.offset(offset);
			}

			let response = self.client.scroll(scroll).await?;

			ids.extend(
				response.result.iter().filter_map(|point| point.id.as_ref().and_then(point_uuid)),
			);

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		Ok(ids)
	}
}
impl VectorIndex for QdrantStore {
	fn upsert<'a>(&'a self, entry: &'a IndexEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert_entry(entry))
	}

	fn delete<'a>(&'a self, listing_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.delete_point(listing_id))
	}

	fn query<'a>(&'a self, vector: &'a [f32], limit: u64) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(self.query_nearest(vector, limit))
	}

	fn list_ids<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(self.scroll_ids())
	}
}

fn point_uuid(id: &PointId) -> Option<Uuid> {
	match id.point_id_options.as_ref()? {
		PointIdOptions::Uuid(raw) => Uuid::parse_str(raw).ok(),
		PointIdOptions::Num(_) => None,
	}
}
