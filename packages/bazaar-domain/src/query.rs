use serde::{Deserialize, Serialize};

use crate::ShapeError;

/// A query normalized into the item being sought and its discrete constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuery {
	pub item_title: String,
	pub preferences: Vec<String>,
}
impl StructuredQuery {
	/// Trims every field, drops blank preferences, and enforces the minimum preference count.
	pub fn new(
		item_title: &str,
		preferences: &[String],
		min_preferences: usize,
	) -> Result<Self, ShapeError> {
		let item_title = item_title.trim();

		if item_title.is_empty() {
			return Err(ShapeError::new("Structured query item_title is empty."));
		}

		let preferences = preferences
			.iter()
			.map(|preference| preference.trim())
			.filter(|preference| !preference.is_empty())
			.map(str::to_string)
			.collect::<Vec<_>>();

		if preferences.len() < min_preferences {
			return Err(ShapeError::new(format!(
				"Structured query needs at least {min_preferences} preferences, got {}.",
				preferences.len()
			)));
		}

		Ok(Self { item_title: item_title.to_string(), preferences })
	}

	pub fn render(&self) -> String {
		let mut out = format!("Item Title: {}\nPreferences:", self.item_title);

		for preference in &self.preferences {
			out.push_str("\n- ");
			out.push_str(preference);
		}

		out
	}
}

/// Where a qualification result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationSource {
	Reasoning,
	Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Qualification {
	Sufficient { query: StructuredQuery, source: QualificationSource },
	NeedsMoreInfo { questions: Vec<String>, source: QualificationSource },
}
impl Qualification {
	/// The deterministic alternate constructor used when the reasoning result is unusable.
	pub fn fallback(raw_query: &str) -> Self {
		Self::NeedsMoreInfo {
			questions: crate::fallback::fallback_questions(raw_query),
			source: QualificationSource::Fallback,
		}
	}

	pub fn is_sufficient(&self) -> bool {
		matches!(self, Self::Sufficient { .. })
	}

	pub fn source(&self) -> QualificationSource {
		match self {
			Self::Sufficient { source, .. } | Self::NeedsMoreInfo { source, .. } => *source,
		}
	}
}
