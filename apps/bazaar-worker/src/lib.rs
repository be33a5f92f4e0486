pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bazaar_service::BazaarService;
use bazaar_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = bazaar_cli::VERSION,
	rename_all = "kebab",
	styles = bazaar_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run a single repair pass and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = bazaar_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let service = BazaarService::new(config, Arc::new(db), Arc::new(qdrant));

	if args.once {
		worker::repair_once(&service).await?;

		return Ok(());
	}

	worker::run_worker(&service).await
}
