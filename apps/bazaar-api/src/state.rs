use std::sync::Arc;

use bazaar_config::Config;
use bazaar_service::BazaarService;
use bazaar_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BazaarService>,
}
impl AppState {
	/// Connects both stores and applies the schema and collection before serving.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = BazaarService::new(config, Arc::new(db), Arc::new(qdrant));

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: BazaarService) -> Self {
		Self { service: Arc::new(service) }
	}
}
