use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Static clarification question sets keyed by a coarse item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSet {
	Laptop,
	Phone,
	Electronics,
	Furniture,
	Textbook,
	Clothing,
	Default,
}
impl QuestionSet {
	/// Picks the first set whose keywords appear as whole words in `query`.
	pub fn detect(query: &str) -> Self {
		KEYWORD_RULES
			.iter()
			.find(|(_, pattern)| pattern.is_match(query))
			.map(|(set, _)| *set)
			.unwrap_or(Self::Default)
	}

	pub fn questions(self) -> &'static [&'static str] {
		match self {
			Self::Laptop => &[
				"What's your budget range? (e.g., under $800, $500-1000)",
				"What will you use it for? (gaming, work, study, programming)",
				"Any preferred brands? (Apple, Dell, HP, Lenovo, etc.)",
				"What condition are you looking for? (new, like new, used)",
			],
			Self::Phone => &[
				"What's your budget range?",
				"Any preferred brands? (iPhone, Samsung, Google, etc.)",
				"What condition are you looking for?",
				"Any specific features needed? (camera quality, storage, etc.)",
			],
			Self::Electronics => &[
				"What's your budget range?",
				"What condition are you looking for?",
				"Any preferred brands?",
				"Where would you prefer pickup?",
			],
			Self::Furniture => &[
				"What's your budget range?",
				"What size/dimensions do you need?",
				"What condition are you looking for?",
				"Where would you prefer pickup? (NUS, NTU, etc.)",
			],
			Self::Textbook => &[
				"What subject are you looking for?",
				"Do you need a specific title or author?",
				"What's your budget range?",
				"What condition is acceptable? (new, used, any condition)",
			],
			Self::Clothing => &[
				"What size do you need?",
				"What's your budget range?",
				"Any preferred brands or styles?",
				"What condition are you looking for?",
			],
			Self::Default => &[
				"What's your budget range?",
				"What condition are you looking for? (new, like new, used)",
				"Any specific requirements or preferences?",
				"Where would you prefer pickup? (NUS, NTU, etc.)",
			],
		}
	}
}

// Order matters: laptop and phone keywords win over the broader electronics set.
static KEYWORD_RULES: LazyLock<Vec<(QuestionSet, Regex)>> = LazyLock::new(|| {
	[
		(QuestionSet::Laptop, &["laptop", "macbook", "computer", "pc"][..]),
		(QuestionSet::Phone, &["phone", "iphone", "samsung", "mobile"][..]),
		(QuestionSet::Electronics, &["tv", "monitor", "speaker", "headphone", "camera"][..]),
		(QuestionSet::Furniture, &["chair", "table", "desk", "bed", "sofa", "furniture"][..]),
		(QuestionSet::Textbook, &["textbook", "book", "novel", "manual"][..]),
		(QuestionSet::Clothing, &["shirt", "pants", "dress", "jacket", "shoes", "clothing"][..]),
	]
	.into_iter()
	.filter_map(|(set, words)| keyword_pattern(words).map(|pattern| (set, pattern)))
	.collect()
});

/// Clarification questions for `query` from its keyword-matched question set.
pub fn fallback_questions(query: &str) -> Vec<String> {
	QuestionSet::detect(query).questions().iter().map(|question| question.to_string()).collect()
}

// Plural forms match too, so "chairs" selects furniture.
fn keyword_pattern(words: &[&str]) -> Option<Regex> {
	let alternation = words.iter().map(|word| regex::escape(word)).collect::<Vec<_>>().join("|");

	Regex::new(&format!(r"(?i)\b(?:{alternation})(?:e?s)?\b")).ok()
}
