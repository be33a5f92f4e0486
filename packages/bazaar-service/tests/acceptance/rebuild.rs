use bazaar_domain::StructuredQuery;
use bazaar_service::{DeleteListingRequest, RebuildReport};
use bazaar_storage::models::IndexState;
use bazaar_testkit::FnReasoner;

use super::{harness, listing_request};

#[tokio::test]
async fn deleted_listing_is_never_surfaced_after_rebuild() {
	let h = harness(FnReasoner::failing());
	let kept = h
		.service
		.create_listing(listing_request("alice", "MacBook Air 2020", "8GB RAM."))
		.await
		.expect("Failed to create listing.");
	let deleted = h
		.service
		.create_listing(listing_request("alice", "MacBook Air 2019", "Battery replaced."))
		.await
		.expect("Failed to create listing.");

	h.index.fail_deletes(true);
	h.service
		.delete_listing(DeleteListingRequest {
			listing_id: deleted.listing_id,
			requester_id: "alice".to_string(),
		})
		.await
		.expect("An index delete failure must not fail the delete.");

	assert!(h.index.contains(deleted.listing_id));

	let query = StructuredQuery::new("MacBook Air", &[], 0).expect("Valid query.");
	let candidates = h.service.retrieve(&query, None).await.expect("Failed to retrieve.");

	assert!(candidates.iter().all(|candidate| candidate.listing.listing_id != deleted.listing_id));

	h.index.fail_deletes(false);

	let report = h.service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report, RebuildReport { rebuilt_count: 1, orphan_count: 1, error_count: 0 });
	assert!(!h.index.contains(deleted.listing_id));
	assert!(h.index.contains(kept.listing_id));

	let candidates = h.service.retrieve(&query, None).await.expect("Failed to retrieve.");

	assert_eq!(
		candidates.iter().map(|candidate| candidate.listing.listing_id).collect::<Vec<_>>(),
		vec![kept.listing_id]
	);
}

#[tokio::test]
async fn rebuild_is_idempotent() {
	let h = harness(FnReasoner::failing());
	let mut ids = Vec::new();

	for title in ["Desk", "Chair", "Bookshelf"] {
		let created = h
			.service
			.create_listing(listing_request("alice", title, "Solid wood."))
			.await
			.expect("Failed to create listing.");

		ids.push(created.listing_id);
	}

	let first = h.service.rebuild_index().await.expect("Failed to rebuild index.");
	let entries = ids.iter().map(|id| h.index.entry(*id)).collect::<Vec<_>>();
	let second = h.service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(first, RebuildReport { rebuilt_count: 3, orphan_count: 0, error_count: 0 });
	assert_eq!(first, second);
	assert_eq!(h.index.len(), 3);
	assert_eq!(ids.iter().map(|id| h.index.entry(*id)).collect::<Vec<_>>(), entries);
}

#[tokio::test]
async fn rebuild_counts_index_failures() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Kettle", "1.7L."))
		.await
		.expect("Failed to create listing.");

	h.index.fail_upserts(true);

	let report = h.service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report, RebuildReport { rebuilt_count: 0, orphan_count: 0, error_count: 1 });
	assert_eq!(
		h.records.snapshot(created.listing_id).map(|record| record.index_state),
		Some(IndexState::Divergent)
	);
}
