//! Validating decoders for the JSON contracts returned by the reasoning service.
//!
//! Every decoder either yields a fully checked value or a [`ShapeError`]. Callers treat a shape
//! error the same way as an upstream failure.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MatchQuality, Qualification, QualificationSource, StructuredQuery, truncate_chars};

static CODE_FENCE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").ok());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ShapeError {
	pub message: String,
}
impl ShapeError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// One analyzer verdict, traceable to exactly one retrieved listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
	pub listing_id: Uuid,
	#[serde(rename = "match")]
	pub quality: MatchQuality,
	pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPick {
	pub listing_id: Uuid,
	#[serde(default)]
	pub justification: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum QualificationWire {
	Sufficient {
		item_title: String,
		#[serde(default)]
		preferences: Vec<String>,
	},
	NeedsMoreInfo {
		#[serde(default)]
		questions: Vec<String>,
	},
}

#[derive(Debug, Deserialize)]
struct RankingWire {
	recommendations: Vec<RankedPick>,
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
	CODE_FENCE
		.as_ref()
		.and_then(|fence| fence.captures(raw))
		.and_then(|captures| captures.get(1))
		.map(|body| body.as_str())
		.unwrap_or_else(|| raw.trim())
}

/// Decodes the qualifier contract.
///
/// A `sufficient` result with fewer than `min_preferences` usable preferences is a shape error,
/// as is a `needs_more_info` result with no questions. Preferences beyond `max_preferences` are
/// dropped.
pub fn decode_qualification(
	raw: &str,
	min_preferences: usize,
	max_preferences: usize,
) -> Result<Qualification, ShapeError> {
	let wire: QualificationWire = serde_json::from_str(strip_code_fence(raw))
		.map_err(|err| ShapeError::new(format!("Qualifier output is not valid JSON: {err}.")))?;

	match wire {
		QualificationWire::Sufficient { item_title, preferences } => {
			let mut query = StructuredQuery::new(&item_title, &preferences, min_preferences)?;

			query.preferences.truncate(max_preferences);

			Ok(Qualification::Sufficient { query, source: QualificationSource::Reasoning })
		},
		QualificationWire::NeedsMoreInfo { questions } => {
			let questions = questions
				.into_iter()
				.map(|question| question.trim().to_string())
				.filter(|question| !question.is_empty())
				.collect::<Vec<_>>();

			if questions.is_empty() {
				return Err(ShapeError::new("Qualifier asked for more info without questions."));
			}

			Ok(Qualification::NeedsMoreInfo { questions, source: QualificationSource::Reasoning })
		},
	}
}

/// Decodes one analyzer verdict and checks that it echoes `expected_id`.
pub fn decode_analysis(
	raw: &str,
	expected_id: Uuid,
	max_justification_chars: usize,
) -> Result<AnalysisVerdict, ShapeError> {
	let mut verdict: AnalysisVerdict = serde_json::from_str(strip_code_fence(raw))
		.map_err(|err| ShapeError::new(format!("Analyzer output is not valid JSON: {err}.")))?;

	if verdict.listing_id != expected_id {
		return Err(ShapeError::new(format!(
			"Analyzer referenced listing {} while analyzing {expected_id}.",
			verdict.listing_id
		)));
	}
	if verdict.justification.trim().is_empty() {
		return Err(ShapeError::new("Analyzer justification is empty."));
	}

	verdict.justification = truncate_chars(&verdict.justification, max_justification_chars);

	Ok(verdict)
}

/// Decodes the ranker contract. Every pick must name a distinct identifier from `known`.
pub fn decode_ranking(raw: &str, known: &[Uuid]) -> Result<Vec<RankedPick>, ShapeError> {
	let wire: RankingWire = serde_json::from_str(strip_code_fence(raw))
		.map_err(|err| ShapeError::new(format!("Ranker output is not valid JSON: {err}.")))?;
	let known = known.iter().collect::<HashSet<_>>();
	let mut seen = HashSet::with_capacity(wire.recommendations.len());

	for pick in &wire.recommendations {
		if !known.contains(&pick.listing_id) {
			return Err(ShapeError::new(format!(
				"Ranker referenced unknown listing {}.",
				pick.listing_id
			)));
		}
		if !seen.insert(pick.listing_id) {
			return Err(ShapeError::new(format!(
				"Ranker referenced listing {} more than once.",
				pick.listing_id
			)));
		}
	}

	Ok(wire.recommendations)
}
