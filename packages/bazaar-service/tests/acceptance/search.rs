use std::{
	collections::HashSet,
	sync::{Arc, Mutex},
};

use bazaar_domain::QualificationSource;
use bazaar_service::{Error, SearchRequest, TurnOutcome, TurnRequest};
use bazaar_testkit::FnReasoner;
use uuid::Uuid;

use super::{
	Harness, RankerScript, SUFFICIENT_MACBOOK, harness, judge_macbooks, listing_request,
	scripted_reasoner, scripted_reply,
};

const CATALOG: [&str; 5] =
	["MacBook Air 2020", "MacBook Pro 2019", "Dell XPS 13 laptop", "IKEA desk", "MacBook charger"];

async fn seed(h: &Harness) -> Vec<Uuid> {
	let mut ids = Vec::with_capacity(CATALOG.len());

	for title in CATALOG {
		let created = h
			.service
			.create_listing(listing_request("seller", title, "Pickup at NUS."))
			.await
			.expect("Failed to create listing.");

		ids.push(created.listing_id);
	}

	ids
}

fn macbook_turn() -> TurnRequest {
	TurnRequest {
		query: "MacBook Air, under $800, used condition, NUS pickup".to_string(),
		additional_text: None,
		k: None,
	}
}

#[tokio::test]
async fn empty_index_yields_no_results() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Reverse));
	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");
	let TurnOutcome::NoResults { query } = outcome else {
		panic!("Expected no results, got {outcome:?}.");
	};

	assert_eq!(query.item_title, "MacBook Air");
	assert_eq!(h.reasoner.calls(), 1);
}

#[tokio::test]
async fn recommendations_are_capped_dense_and_plausible() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Reverse));
	let ids = seed(&h).await;
	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");
	let TurnOutcome::Recommendations { recommendations, .. } = outcome else {
		panic!("Expected recommendations, got {outcome:?}.");
	};
	let desk_id = ids[3];

	assert_eq!(recommendations.len(), 3);
	assert_eq!(recommendations.iter().map(|rec| rec.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
	assert!(recommendations.iter().all(|rec| rec.listing_id != desk_id));
	assert!(recommendations.iter().all(|rec| rec.justification == "Chosen by the ranker."));
	assert_eq!(
		recommendations.iter().map(|rec| rec.listing_id).collect::<HashSet<_>>().len(),
		recommendations.len()
	);
}

#[tokio::test]
async fn unusable_ranking_falls_back_to_quality_order() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Garbage));

	seed(&h).await;

	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");
	let TurnOutcome::Recommendations { recommendations, .. } = outcome else {
		panic!("Expected recommendations, got {outcome:?}.");
	};

	assert_eq!(recommendations.len(), 3);
	assert_eq!(recommendations[0].title, "MacBook Air 2020");
	assert_eq!(recommendations[1].title, "MacBook Pro 2019");
	assert!(recommendations[0].justification.contains("NUS pickup"));
	assert!(recommendations.iter().all(|rec| rec.title != "IKEA desk"));
}

#[tokio::test]
async fn implausible_candidates_yield_no_results() {
	let h = harness(scripted_reasoner(|_| "none", RankerScript::Reverse));

	seed(&h).await;

	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");

	assert!(matches!(outcome, TurnOutcome::NoResults { .. }));
}

#[tokio::test]
async fn mismatched_analysis_asks_to_try_again() {
	let h = harness(FnReasoner::new(|system, _| {
		if system.starts_with("You qualify") {
			return Ok(SUFFICIENT_MACBOOK.to_string());
		}

		Ok(serde_json::json!({
			"listing_id": Uuid::new_v4(),
			"match": "strong",
			"justification": "Fits.",
		})
		.to_string())
	}));

	seed(&h).await;

	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");

	assert!(matches!(outcome, TurnOutcome::TryAgain { .. }));
}

#[tokio::test]
async fn index_outage_asks_to_try_again() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Reverse));

	seed(&h).await;
	h.index.fail_queries(true);

	let outcome = h.service.turn(macbook_turn()).await.expect("Turn failed.");

	assert!(matches!(outcome, TurnOutcome::TryAgain { .. }));
}

#[tokio::test]
async fn follow_up_turn_appends_answers() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let recorder = seen.clone();
	let h = harness(FnReasoner::new(move |system, prompt| {
		if system.starts_with("You qualify") {
			recorder.lock().expect("Lock poisoned.").push(prompt.to_string());
		}

		Ok(scripted_reply(system, prompt, &judge_macbooks, RankerScript::Reverse))
	}));

	seed(&h).await;

	let first = h
		.service
		.turn(TurnRequest { query: "laptop".to_string(), additional_text: None, k: None })
		.await
		.expect("Turn failed.");
	let TurnOutcome::NeedsMoreInfo { pending_query, questions, source } = first else {
		panic!("Expected a clarification request, got {first:?}.");
	};

	assert_eq!(pending_query, "laptop");
	assert!(!questions.is_empty());
	assert_eq!(source, QualificationSource::Reasoning);

	let second = h
		.service
		.turn(TurnRequest {
			query: pending_query,
			additional_text: Some("MacBook Air under $800, used, NUS pickup".to_string()),
			k: Some(2),
		})
		.await
		.expect("Turn failed.");

	assert!(matches!(second, TurnOutcome::Recommendations { .. }));
	assert!(
		seen.lock()
			.expect("Lock poisoned.")
			.last()
			.is_some_and(|prompt| prompt.ends_with("laptop MacBook Air under $800, used, NUS pickup"))
	);
}

#[tokio::test]
async fn explicit_k_limits_candidates() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Reverse));

	seed(&h).await;

	let outcome = h
		.service
		.search(SearchRequest {
			item_title: "MacBook Air".to_string(),
			preferences: vec!["under $800".to_string()],
			k: Some(1),
		})
		.await
		.expect("Search failed.");
	let TurnOutcome::Recommendations { recommendations, .. } = outcome else {
		panic!("Expected recommendations, got {outcome:?}.");
	};

	assert!(recommendations.len() <= 1);
	// One analyzer call and one ranker call.
	assert_eq!(h.reasoner.calls(), 2);
}

#[tokio::test]
async fn blank_search_is_rejected() {
	let h = harness(scripted_reasoner(judge_macbooks, RankerScript::Reverse));
	let err = h
		.service
		.search(SearchRequest { item_title: " ".to_string(), preferences: Vec::new(), k: None })
		.await
		.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}
