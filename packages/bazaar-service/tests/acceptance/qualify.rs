use std::{sync::Arc, time::Duration};

use bazaar_domain::{Qualification, QualificationSource, QuestionSet};
use bazaar_service::Error;
use bazaar_testkit::{FnReasoner, HashEmbedding};

use super::{NEEDS_MORE_INFO, SUFFICIENT_MACBOOK, harness, harness_with};

#[tokio::test]
async fn vague_query_falls_back_to_keyword_questions() {
	let h = harness(FnReasoner::failing());
	let qualification = h.service.qualify("laptop").await.expect("Failed to qualify.");

	assert_eq!(
		qualification,
		Qualification::NeedsMoreInfo {
			questions: QuestionSet::Laptop.questions().iter().map(|q| q.to_string()).collect(),
			source: QualificationSource::Fallback,
		}
	);
}

#[tokio::test]
async fn specific_query_is_sufficient() {
	let h = harness(FnReasoner::new(|_, _| Ok(SUFFICIENT_MACBOOK.to_string())));
	let qualification = h
		.service
		.qualify("MacBook Air, under $800, used condition, NUS pickup")
		.await
		.expect("Failed to qualify.");
	let Qualification::Sufficient { query, source } = qualification else {
		panic!("Expected a sufficient qualification.");
	};

	assert_eq!(query.item_title, "MacBook Air");
	assert!(query.preferences.len() >= 2);
	assert_eq!(source, QualificationSource::Reasoning);
}

#[tokio::test]
async fn reasoning_questions_are_kept() {
	let h = harness(FnReasoner::new(|_, _| Ok(NEEDS_MORE_INFO.to_string())));
	let qualification = h.service.qualify("something for my room").await.expect("Failed.");

	assert_eq!(qualification.source(), QualificationSource::Reasoning);
	assert!(!qualification.is_sufficient());
}

#[tokio::test]
async fn malformed_output_falls_back() {
	let h = harness(FnReasoner::new(|_, _| Ok("SUFFICIENT".to_string())));
	let qualification = h.service.qualify("iphone 13").await.expect("Failed to qualify.");

	assert_eq!(qualification.source(), QualificationSource::Fallback);
	assert_eq!(
		qualification,
		Qualification::NeedsMoreInfo {
			questions: QuestionSet::Phone.questions().iter().map(|q| q.to_string()).collect(),
			source: QualificationSource::Fallback,
		}
	);
}

#[tokio::test]
async fn too_few_preferences_falls_back() {
	let h = harness(FnReasoner::new(|_, _| {
		Ok(r#"{"status":"sufficient","item_title":"Desk","preferences":["cheap"]}"#.to_string())
	}));
	let qualification = h.service.qualify("cheap desk").await.expect("Failed to qualify.");

	assert_eq!(qualification.source(), QualificationSource::Fallback);
	assert!(!qualification.is_sufficient());
}

#[tokio::test]
async fn slow_reasoning_times_out_into_fallback() {
	let mut cfg = bazaar_testkit::test_config();

	cfg.providers.reasoning.timeout_ms = 20;

	let reasoner = FnReasoner::new(|_, _| Ok(SUFFICIENT_MACBOOK.to_string()))
		.with_delay(Duration::from_millis(500));
	let h = harness_with(cfg, Arc::new(HashEmbedding::new()), reasoner);
	let qualification = h
		.service
		.qualify("MacBook Air, under $800, used condition, NUS pickup")
		.await
		.expect("Failed to qualify.");

	assert_eq!(qualification.source(), QualificationSource::Fallback);
	assert_eq!(h.reasoner.calls(), 1);
}

#[tokio::test]
async fn blank_query_is_rejected() {
	let h = harness(FnReasoner::failing());
	let err = h.service.qualify("   ").await.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(h.reasoner.calls(), 0);
}
