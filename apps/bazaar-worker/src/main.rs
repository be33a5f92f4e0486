use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = bazaar_worker::Args::parse();

	bazaar_worker::run(args).await
}
