use std::{sync::Arc, time::Duration};

use bazaar_service::{DeleteListingRequest, Error, ListingPatch, UpdateListingRequest};
use bazaar_storage::{RecordStore, models::IndexState};
use bazaar_testkit::{FnReasoner, HashEmbedding};

use super::{Harness, harness, harness_with, listing_request, peer};

const SLOW_EMBEDDING: Duration = Duration::from_millis(200);
const HEAD_START: Duration = Duration::from_millis(50);

fn retitle(listing_id: uuid::Uuid, title: &str) -> UpdateListingRequest {
	UpdateListingRequest {
		listing_id,
		requester_id: "alice".to_string(),
		fields: ListingPatch { title: Some(title.to_string()), ..Default::default() },
	}
}

fn remove(listing_id: uuid::Uuid) -> DeleteListingRequest {
	DeleteListingRequest { listing_id, requester_id: "alice".to_string() }
}

/// Either both stores forgot the listing or the index entry was built from the stored record.
fn assert_stores_agree(h: &Harness, listing_id: uuid::Uuid) {
	match (h.records.snapshot(listing_id), h.index.entry(listing_id)) {
		(None, None) => {},
		(Some(record), Some(entry)) => {
			assert_eq!(entry.title, record.title);
			assert_eq!(record.index_state, IndexState::Synced);
		},
		(record, entry) => panic!("Stores disagree: record {record:?}, entry {entry:?}."),
	}
}

fn slow_harness() -> Harness {
	harness_with(
		bazaar_testkit::test_config(),
		Arc::new(HashEmbedding::new().with_delay(SLOW_EMBEDDING)),
		FnReasoner::failing(),
	)
}

#[tokio::test]
async fn update_racing_delete_in_one_service_keeps_stores_in_step() {
	let h = slow_harness();
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let (updated, deleted) = tokio::join!(
		h.service.update_listing(retitle(created.listing_id, "New Laptop")),
		h.service.delete_listing(remove(created.listing_id)),
	);

	updated.expect("Update failed.");
	deleted.expect("Delete failed.");

	assert!(h.records.snapshot(created.listing_id).is_none());
	assert!(!h.index.contains(created.listing_id));
}

#[tokio::test]
async fn delete_racing_update_in_one_service_keeps_stores_in_step() {
	let h = slow_harness();
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let (deleted, updated) = tokio::join!(
		h.service.delete_listing(remove(created.listing_id)),
		h.service.update_listing(retitle(created.listing_id, "New Laptop")),
	);

	deleted.expect("Delete failed.");

	assert!(matches!(updated, Err(Error::NotFound { .. })));

	assert_stores_agree(&h, created.listing_id);
}

#[tokio::test]
async fn update_racing_delete_across_services_leaves_no_entry() {
	let h = slow_harness();
	let other = peer(&h, Arc::new(HashEmbedding::new()));
	let created = other
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let (updated, deleted) = tokio::join!(
		h.service.update_listing(retitle(created.listing_id, "New Laptop")),
		async {
			tokio::time::sleep(HEAD_START).await;

			other.delete_listing(remove(created.listing_id)).await
		},
	);

	updated.expect("Update failed.");
	deleted.expect("Delete failed.");

	assert!(h.records.snapshot(created.listing_id).is_none());
	assert!(!h.index.contains(created.listing_id));
}

#[tokio::test]
async fn rebuild_in_another_process_does_not_restore_stale_text() {
	let h = harness(FnReasoner::failing());
	let worker = peer(&h, Arc::new(HashEmbedding::new().with_delay(SLOW_EMBEDDING)));
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let (report, updated) = tokio::join!(worker.rebuild_index(), async {
		tokio::time::sleep(HEAD_START).await;

		h.service.update_listing(retitle(created.listing_id, "New Laptop")).await
	});

	report.expect("Rebuild failed.");
	updated.expect("Update failed.");

	let record = h.records.snapshot(created.listing_id).expect("Expected a record.");
	let entry = h.index.entry(created.listing_id).expect("Expected an index entry.");

	assert_eq!(record.title, "New Laptop");
	assert_eq!(entry.title, "New Laptop");
	assert_eq!(record.index_state, IndexState::Synced);
	assert_eq!(record.revision, 2);
}

#[tokio::test]
async fn rebuild_in_another_process_does_not_resurrect_deleted_listing() {
	let h = harness(FnReasoner::failing());
	let worker = peer(&h, Arc::new(HashEmbedding::new().with_delay(SLOW_EMBEDDING)));
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let (report, deleted) = tokio::join!(worker.rebuild_index(), async {
		tokio::time::sleep(HEAD_START).await;

		h.service.delete_listing(remove(created.listing_id)).await
	});

	report.expect("Rebuild failed.");
	deleted.expect("Delete failed.");

	assert!(h.records.snapshot(created.listing_id).is_none());
	assert!(!h.index.contains(created.listing_id));
	assert!(h.index.is_empty());
}

#[tokio::test]
async fn stale_record_write_is_rejected() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let stale = h.records.snapshot(created.listing_id).expect("Expected a record.");

	h.service
		.update_listing(retitle(created.listing_id, "New Laptop"))
		.await
		.expect("Update failed.");

	let mut overwrite = stale.clone();

	overwrite.price_cents = 1;

	let err = h.records.update_listing(&overwrite).await.expect_err("Expected a conflict.");

	assert!(matches!(err, bazaar_storage::Error::Conflict(_)));

	let record = h.records.snapshot(created.listing_id).expect("Expected a record.");

	assert_eq!(record.title, "New Laptop");
	assert_eq!(record.price_cents, 75_000);
}

#[tokio::test]
async fn index_state_for_an_old_revision_is_ignored() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Old Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");

	h.service
		.update_listing(retitle(created.listing_id, "New Laptop"))
		.await
		.expect("Update failed.");

	let recorded = h
		.records
		.set_index_state(created.listing_id, 1, IndexState::Divergent, Some("Stale."))
		.await
		.expect("Failed to set index state.");

	assert!(!recorded);

	let record = h.records.snapshot(created.listing_id).expect("Expected a record.");

	assert_eq!(record.index_state, IndexState::Synced);
	assert!(record.index_error.is_none());
}
