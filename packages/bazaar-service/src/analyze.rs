use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_domain::{MatchQuality, StructuredQuery, decode::decode_analysis, listing::format_price};

use crate::{BazaarService, Result, retrieve::Candidate};

const ANALYZER_SYSTEM_PROMPT: &str = "You judge how well one marketplace listing fits a buyer's preferences. \
Output must be valid JSON only and must match the provided schema exactly. \
Echo the listing_id you were given. \
match is strong when every preference is met, partial when most are, weak when few are, and none when the listing is not the item sought. \
The justification must mention price, condition, category and location fit in at most MAX_JUSTIFICATION_CHARS characters. \
Use only facts present in the listing.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAnalysis {
	pub listing_id: Uuid,
	#[serde(rename = "match")]
	pub quality: MatchQuality,
	pub justification: String,
	pub retrieval_rank: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Analysis {
	NoCandidates,
	Analyzed(Vec<MatchAnalysis>),
}

impl BazaarService {
	/// Analyzes each candidate with its own reasoning call, in retrieval order.
	///
	/// Any failure or malformed verdict fails the whole stage.
	pub async fn analyze(
		&self,
		query: &StructuredQuery,
		candidates: &[Candidate],
	) -> Result<Analysis> {
		if candidates.is_empty() {
			return Ok(Analysis::NoCandidates);
		}

		let max_chars = self.cfg.search.max_justification_chars;
		let mut analyses = Vec::with_capacity(candidates.len());

		for candidate in candidates {
			let prompt = analyzer_prompt(query, candidate, max_chars);
			let raw = self.reason(ANALYZER_SYSTEM_PROMPT, &prompt).await?;
			let verdict = decode_analysis(&raw, candidate.listing.listing_id, max_chars as usize)?;

			tracing::debug!(
				listing_id = %verdict.listing_id,
				quality = ?verdict.quality,
				"Candidate analyzed."
			);

			analyses.push(MatchAnalysis {
				listing_id: verdict.listing_id,
				quality: verdict.quality,
				justification: verdict.justification,
				retrieval_rank: candidate.rank,
			});
		}

		Ok(Analysis::Analyzed(analyses))
	}
}

fn analyzer_prompt(query: &StructuredQuery, candidate: &Candidate, max_chars: u32) -> String {
	let listing = &candidate.listing;
	let schema = serde_json::json!({
		"listing_id": "string",
		"match": "strong|partial|weak|none",
		"justification": "string"
	});
	let descriptor = serde_json::json!({
		"listing_id": listing.listing_id,
		"title": listing.title,
		"description": listing.description,
		"brand": listing.brand,
		"category": listing.category.label(),
		"condition": listing.condition.label(),
		"price": format_price(listing.price_cents),
		"negotiable": listing.negotiable,
		"age_months": listing.age_months,
		"campus": listing.campus,
		"delivery_option": listing.delivery_option,
	});

	format!(
		"Return JSON matching this exact schema:\n{schema}\nConstraints:\n- MAX_JUSTIFICATION_CHARS = {max_chars}\n{}\nListing:\n{descriptor}",
		query.render()
	)
}
