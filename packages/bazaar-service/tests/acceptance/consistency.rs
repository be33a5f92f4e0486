use std::sync::Arc;

use bazaar_service::{
	DeleteListingRequest, Error, GetListingRequest, ListListingsRequest, ListingOp, ListingPatch,
	UpdateListingRequest,
};
use bazaar_storage::models::IndexState;
use bazaar_testkit::{FailingEmbedding, FnReasoner};

use super::{harness, harness_with, listing_request};

#[tokio::test]
async fn create_indexes_listing_under_its_id() {
	let h = harness(FnReasoner::failing());
	let response = h
		.service
		.create_listing(listing_request("alice", "MacBook Air 2020", "8GB RAM, light scratches."))
		.await
		.expect("Failed to create listing.");

	assert_eq!(response.op, ListingOp::Create);
	assert_eq!(response.index_state, IndexState::Synced);
	assert!(response.warning.is_none());

	let entry = h.index.entry(response.listing_id).expect("Expected an index entry.");
	let record = h.records.snapshot(response.listing_id).expect("Expected a record.");

	assert_eq!(entry.listing_id, response.listing_id);
	assert_eq!(entry.title, "MacBook Air 2020");
	assert_eq!(entry.price_cents, 75_000);
	assert_eq!(entry.vector.len(), 64);
	assert_eq!(record.index_state, IndexState::Synced);
	assert!(record.indexed_at.is_some());
}

#[tokio::test]
async fn index_failure_keeps_record_and_marks_divergent() {
	let h = harness(FnReasoner::failing());

	h.index.fail_upserts(true);

	let response = h
		.service
		.create_listing(listing_request("alice", "Desk lamp", "Warm light."))
		.await
		.expect("An index failure must not fail the create.");

	assert_eq!(response.index_state, IndexState::Divergent);
	assert!(response.warning.is_some());
	assert!(!h.index.contains(response.listing_id));

	let record = h.records.snapshot(response.listing_id).expect("Record must survive.");

	assert_eq!(record.index_state, IndexState::Divergent);
	assert!(record.index_error.is_some());

	h.index.fail_upserts(false);

	let report = h.service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report.rebuilt_count, 1);
	assert!(h.index.contains(response.listing_id));
	assert_eq!(
		h.records.snapshot(response.listing_id).map(|record| record.index_state),
		Some(IndexState::Synced)
	);
}

#[tokio::test]
async fn embedding_failure_marks_divergent() {
	let h = harness_with(
		bazaar_testkit::test_config(),
		Arc::new(FailingEmbedding),
		FnReasoner::failing(),
	);
	let response = h
		.service
		.create_listing(listing_request("alice", "Rice cooker", "Barely used."))
		.await
		.expect("An embedding failure must not fail the create.");

	assert_eq!(response.index_state, IndexState::Divergent);
	assert_eq!(h.records.len(), 1);
	assert!(h.index.is_empty());
}

#[tokio::test]
async fn invalid_fields_are_rejected_before_any_write() {
	let h = harness(FnReasoner::failing());
	let mut request = listing_request("alice", "Bicycle", "Foldable.");

	request.price_cents = -1;

	let err = h.service.create_listing(request).await.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert!(h.records.is_empty());
	assert_eq!(h.records.write_count(), 0);

	let err = h
		.service
		.create_listing(listing_request("alice", "   ", "No title."))
		.await
		.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn non_owner_delete_changes_nothing() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Monitor 27 inch", "1440p."))
		.await
		.expect("Failed to create listing.");
	let writes = h.records.write_count();
	let err = h
		.service
		.delete_listing(DeleteListingRequest {
			listing_id: created.listing_id,
			requester_id: "mallory".to_string(),
		})
		.await
		.expect_err("Expected a permission error.");

	assert!(matches!(err, Error::PermissionDenied { .. }));
	assert_eq!(h.records.write_count(), writes);
	assert!(h.index.contains(created.listing_id));
	assert_eq!(
		h.records.snapshot(created.listing_id).map(|record| record.owner_id),
		Some("alice".to_string())
	);
}

#[tokio::test]
async fn non_owner_update_changes_nothing() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Monitor 27 inch", "1440p."))
		.await
		.expect("Failed to create listing.");
	let before = h.records.snapshot(created.listing_id);
	let err = h
		.service
		.update_listing(UpdateListingRequest {
			listing_id: created.listing_id,
			requester_id: "mallory".to_string(),
			fields: ListingPatch { price_cents: Some(1), ..Default::default() },
		})
		.await
		.expect_err("Expected a permission error.");

	assert!(matches!(err, Error::PermissionDenied { .. }));
	assert_eq!(h.records.snapshot(created.listing_id), before);
}

#[tokio::test]
async fn metadata_update_skips_reembedding() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "MacBook Air 2020", "8GB RAM."))
		.await
		.expect("Failed to create listing.");

	assert_eq!(h.index.upsert_count(), 1);

	let response = h
		.service
		.update_listing(UpdateListingRequest {
			listing_id: created.listing_id,
			requester_id: "alice".to_string(),
			fields: ListingPatch { price_cents: Some(70_000), ..Default::default() },
		})
		.await
		.expect("Failed to update listing.");

	assert_eq!(response.op, ListingOp::Update);
	assert!(!response.reindexed);
	assert_eq!(h.index.upsert_count(), 1);
	assert_eq!(
		h.records.snapshot(created.listing_id).map(|record| record.price_cents),
		Some(70_000)
	);

	let response = h
		.service
		.update_listing(UpdateListingRequest {
			listing_id: created.listing_id,
			requester_id: "alice".to_string(),
			fields: ListingPatch {
				title: Some("MacBook Air 2020 M1".to_string()),
				..Default::default()
			},
		})
		.await
		.expect("Failed to update listing.");

	assert!(response.reindexed);
	assert_eq!(response.index_state, IndexState::Synced);
	assert_eq!(h.index.upsert_count(), 2);
	assert_eq!(
		h.index.entry(created.listing_id).map(|entry| entry.title),
		Some("MacBook Air 2020 M1".to_string())
	);
}

#[tokio::test]
async fn unchanged_update_is_a_no_op() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Yoga mat", "Purple."))
		.await
		.expect("Failed to create listing.");
	let writes = h.records.write_count();
	let response = h
		.service
		.update_listing(UpdateListingRequest {
			listing_id: created.listing_id,
			requester_id: "alice".to_string(),
			fields: ListingPatch { title: Some(" Yoga mat ".to_string()), ..Default::default() },
		})
		.await
		.expect("Failed to update listing.");

	assert_eq!(response.op, ListingOp::None);
	assert_eq!(h.records.write_count(), writes);
	assert_eq!(h.index.upsert_count(), 1);
}

#[tokio::test]
async fn update_rejects_blank_title() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Yoga mat", "Purple."))
		.await
		.expect("Failed to create listing.");
	let err = h
		.service
		.update_listing(UpdateListingRequest {
			listing_id: created.listing_id,
			requester_id: "alice".to_string(),
			fields: ListingPatch { title: Some(String::new()), ..Default::default() },
		})
		.await
		.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn delete_removes_record_and_embedding() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Textbook CS2040", "Clean copy."))
		.await
		.expect("Failed to create listing.");
	let response = h
		.service
		.delete_listing(DeleteListingRequest {
			listing_id: created.listing_id,
			requester_id: "alice".to_string(),
		})
		.await
		.expect("Failed to delete listing.");

	assert_eq!(response.op, ListingOp::Delete);
	assert!(h.records.is_empty());
	assert!(!h.index.contains(created.listing_id));

	let err = h
		.service
		.get_listing(GetListingRequest { listing_id: created.listing_id })
		.await
		.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn list_returns_only_owned_listings() {
	let h = harness(FnReasoner::failing());

	for title in ["Desk", "Chair"] {
		h.service
			.create_listing(listing_request("alice", title, "IKEA."))
			.await
			.expect("Failed to create listing.");
	}

	h.service
		.create_listing(listing_request("bob", "Sofa", "Grey."))
		.await
		.expect("Failed to create listing.");

	let listed = h
		.service
		.list_listings(ListListingsRequest { owner_id: "alice".to_string() })
		.await
		.expect("Failed to list listings.");

	assert_eq!(listed.items.len(), 2);
	assert!(listed.items.iter().all(|item| item.owner_id == "alice"));
	assert!(listed.items.iter().all(|item| item.price == "$750.00"));
	assert!(listed.items.iter().all(|item| item.index_state == IndexState::Synced));
}

#[tokio::test]
async fn concurrent_updates_leave_index_matching_record() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Camera", "Mirrorless."))
		.await
		.expect("Failed to create listing.");
	let update = |title: &str| UpdateListingRequest {
		listing_id: created.listing_id,
		requester_id: "alice".to_string(),
		fields: ListingPatch { title: Some(title.to_string()), ..Default::default() },
	};
	let (first, second) = tokio::join!(
		h.service.update_listing(update("Camera Sony A6000")),
		h.service.update_listing(update("Camera Fujifilm X-T20")),
	);

	first.expect("First update failed.");
	second.expect("Second update failed.");

	let record = h.records.snapshot(created.listing_id).expect("Expected a record.");
	let entry = h.index.entry(created.listing_id).expect("Expected an index entry.");

	assert_eq!(entry.title, record.title);
	assert_eq!(record.index_state, IndexState::Synced);
}

#[tokio::test]
async fn original_price_can_be_cleared() {
	let h = harness(FnReasoner::failing());
	let created = h
		.service
		.create_listing(listing_request("alice", "Desk", "Solid oak."))
		.await
		.expect("Failed to create listing.");
	let req: UpdateListingRequest = serde_json::from_value(serde_json::json!({
		"listing_id": created.listing_id,
		"requester_id": "alice",
		"fields": { "original_price_cents": null },
	}))
	.expect("Failed to parse update request.");
	let response = h.service.update_listing(req).await.expect("Failed to update listing.");

	assert_eq!(response.op, ListingOp::Update);
	assert!(!response.reindexed);

	let record = h.records.snapshot(created.listing_id).expect("Expected a record.");

	assert_eq!(record.original_price_cents, None);
	assert_eq!(record.price_cents, 75_000);
}
