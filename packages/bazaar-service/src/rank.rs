use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_domain::{StructuredQuery, decode::decode_ranking, truncate_chars};

use crate::{BazaarService, Error, Result, analyze::MatchAnalysis, retrieve::Candidate};

const RANKER_SYSTEM_PROMPT: &str = "You pick the best marketplace listings for a buyer. \
Output must be valid JSON only and must match the provided schema exactly. \
Return at most MAX_RECOMMENDATIONS recommendations, best first, using only listing_id values from the analyses. \
Never repeat a listing and never include a listing whose match is none. \
Each justification is one or two sentences grounded in the analysis.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
	pub listing_id: Uuid,
	pub title: String,
	pub justification: String,
	/// Dense, starting at 1.
	pub rank: u32,
}

impl BazaarService {
	/// Orders plausible analyses into at most `search.max_recommendations` recommendations.
	///
	/// A reasoning failure or malformed ranking falls back to ordering by match quality, then
	/// retrieval rank, then identifier.
	pub async fn rank(
		&self,
		query: &StructuredQuery,
		candidates: &[Candidate],
		analyses: &[MatchAnalysis],
	) -> Result<Vec<Recommendation>> {
		let plausible =
			analyses.iter().filter(|analysis| analysis.quality.is_plausible()).collect::<Vec<_>>();

		if plausible.is_empty() {
			return Ok(Vec::new());
		}

		let limit = (self.cfg.search.max_recommendations as usize).min(plausible.len());
		let titles = candidates
			.iter()
			.map(|candidate| (candidate.listing.listing_id, candidate.listing.title.as_str()))
			.collect::<HashMap<_, _>>();
		let ranked = self.rank_with_reasoning(query, &plausible, &titles, limit).await;
		let recommendations = match ranked {
			Ok(recommendations) => recommendations,
			Err(err) => {
				tracing::warn!(error = %err, "Ranker falling back to deterministic order.");

				fallback_ranking(&plausible, &titles, limit)
			},
		};

		Ok(recommendations)
	}

	async fn rank_with_reasoning(
		&self,
		query: &StructuredQuery,
		plausible: &[&MatchAnalysis],
		titles: &HashMap<Uuid, &str>,
		limit: usize,
	) -> Result<Vec<Recommendation>> {
		let schema = serde_json::json!({
			"recommendations": [
				{ "listing_id": "string", "justification": "string" }
			]
		});
		let analyses_json = serde_json::to_string(plausible).map_err(|_| Error::InvalidRequest {
			message: "Failed to serialize analyses for ranker.".to_string(),
		})?;
		let prompt = format!(
			"Return JSON matching this exact schema:\n{schema}\nConstraints:\n- MAX_RECOMMENDATIONS = {limit}\n{}\nAnalyses as JSON:\n{analyses_json}",
			query.render()
		);
		let raw = self.reason(RANKER_SYSTEM_PROMPT, &prompt).await?;
		let known = titles.keys().copied().collect::<Vec<_>>();
		let picks = decode_ranking(&raw, &known)?;
		let by_id = plausible
			.iter()
			.map(|analysis| (analysis.listing_id, *analysis))
			.collect::<HashMap<_, _>>();
		let max_chars = self.cfg.search.max_justification_chars as usize;
		let mut recommendations = Vec::with_capacity(limit);

		// Picks naming a listing judged `none` are dropped rather than rejected.
		for pick in picks {
			let Some(analysis) = by_id.get(&pick.listing_id) else {
				continue;
			};
			let justification = if pick.justification.trim().is_empty() {
				analysis.justification.as_str()
			} else {
				pick.justification.as_str()
			};

			recommendations.push(Recommendation {
				listing_id: pick.listing_id,
				title: titles.get(&pick.listing_id).copied().unwrap_or_default().to_string(),
				justification: truncate_chars(justification, max_chars),
				rank: recommendations.len() as u32 + 1,
			});

			if recommendations.len() == limit {
				break;
			}
		}

		if recommendations.is_empty() {
			return Err(Error::ShapeMismatch {
				message: "Ranker returned no plausible recommendations.".to_string(),
			});
		}

		Ok(recommendations)
	}
}

fn fallback_ranking(
	plausible: &[&MatchAnalysis],
	titles: &HashMap<Uuid, &str>,
	limit: usize,
) -> Vec<Recommendation> {
	let mut ordered = plausible.to_vec();

	ordered.sort_by(|a, b| {
		a.quality
			.cmp(&b.quality)
			.then(a.retrieval_rank.cmp(&b.retrieval_rank))
			.then(a.listing_id.cmp(&b.listing_id))
	});

	ordered
		.into_iter()
		.take(limit)
		.enumerate()
		.map(|(idx, analysis)| Recommendation {
			listing_id: analysis.listing_id,
			title: titles.get(&analysis.listing_id).copied().unwrap_or_default().to_string(),
			justification: analysis.justification.clone(),
			rank: idx as u32 + 1,
		})
		.collect()
}
