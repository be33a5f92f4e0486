pub mod decode;
pub mod fallback;
pub mod listing;
pub mod query;

pub use decode::{AnalysisVerdict, RankedPick, ShapeError};
pub use fallback::QuestionSet;
pub use listing::{Category, Condition, ListingText, MatchQuality};
pub use query::{Qualification, QualificationSource, StructuredQuery};

const ELLIPSIS: &str = "...";

/// Truncates `text` to at most `max_chars` characters, appending an ellipsis when cut and the
/// limit leaves room for more than the ellipsis itself.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	let trimmed = text.trim();

	if trimmed.chars().count() <= max_chars {
		return trimmed.to_string();
	}
	if max_chars <= ELLIPSIS.len() {
		return trimmed.chars().take(max_chars).collect();
	}

	let mut out: String = trimmed.chars().take(max_chars - ELLIPSIS.len()).collect();

	out.push_str(ELLIPSIS);

	out
}
