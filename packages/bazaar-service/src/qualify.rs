use bazaar_domain::{Qualification, decode::decode_qualification};

use crate::{BazaarService, Error, Result};

const QUALIFIER_SYSTEM_PROMPT: &str = "You qualify search queries for a campus second-hand marketplace. \
Output must be valid JSON only and must match the provided schema exactly. \
A query is sufficient when it names a clear item category and states at least two of: budget, condition, brand, an explicit requirement. \
When sufficient, item_title is the item being sought without any constraints, and preferences lists each constraint as a short phrase. \
When not sufficient, ask 2 to 4 short questions that would make the query sufficient. \
Never invent preferences the query does not state.";

impl BazaarService {
	/// Decides whether `raw_query` is specific enough to search.
	///
	/// Only a blank query is an error. Any reasoning failure, timeout, or malformed output falls
	/// back to the keyword question set.
	pub async fn qualify(&self, raw_query: &str) -> Result<Qualification> {
		let raw_query = raw_query.trim();

		if raw_query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let cfg = &self.cfg.qualifier;
		let schema = serde_json::json!({
			"oneOf": [
				{ "status": "sufficient", "item_title": "string", "preferences": "string[]" },
				{ "status": "needs_more_info", "questions": "string[]" }
			]
		});
		let prompt = format!(
			"Return JSON matching this exact schema:\n{schema}\nConstraints:\n- MIN_PREFERENCES = {}\nQuery:\n{raw_query}",
			cfg.min_preferences
		);
		let decoded = match self.reason(QUALIFIER_SYSTEM_PROMPT, &prompt).await {
			Ok(raw) => decode_qualification(
				&raw,
				cfg.min_preferences as usize,
				cfg.max_preferences as usize,
			)
			.map_err(Error::from),
			Err(err) => Err(err),
		};

		match decoded {
			Ok(qualification) => {
				tracing::info!(
					sufficient = qualification.is_sufficient(),
					"Query qualified by reasoning service."
				);

				Ok(qualification)
			},
			Err(err) => {
				tracing::warn!(error = %err, "Qualifier falling back to keyword questions.");

				Ok(Qualification::fallback(raw_query))
			},
		}
	}
}
