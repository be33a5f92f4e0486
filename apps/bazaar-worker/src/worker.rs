use std::time::Duration;

use tokio::time;

use bazaar_service::{BazaarService, RebuildReport};

/// One repair cycle: re-derive every embedding and drop orphaned index entries.
pub async fn repair_once(service: &BazaarService) -> bazaar_service::Result<RebuildReport> {
	let report = service.rebuild_index().await?;

	if report.error_count > 0 {
		tracing::warn!(
			rebuilt_count = report.rebuilt_count,
			orphan_count = report.orphan_count,
			error_count = report.error_count,
			"Repair cycle left divergent listings."
		);
	} else {
		tracing::info!(
			rebuilt_count = report.rebuilt_count,
			orphan_count = report.orphan_count,
			"Repair cycle finished."
		);
	}

	Ok(report)
}

/// Runs repair cycles forever on the configured interval. A failed cycle is logged and retried
/// on the next tick.
pub async fn run_worker(service: &BazaarService) -> color_eyre::Result<()> {
	let repair = &service.cfg.repair;

	if !repair.enabled {
		tracing::info!("Repair worker disabled by configuration.");

		return Ok(());
	}

	let mut ticker = time::interval(Duration::from_secs(repair.interval_seconds));

	ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		if let Err(err) = repair_once(service).await {
			tracing::error!(error = %err, "Repair cycle failed.");
		}
	}
}
