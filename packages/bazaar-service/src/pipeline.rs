use serde::{Deserialize, Serialize};

use bazaar_domain::{Qualification, QualificationSource, StructuredQuery};

use crate::{BazaarService, Error, Result, analyze::Analysis, rank::Recommendation};

const TRY_AGAIN_MESSAGE: &str = "Search is temporarily unavailable. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
	Start,
	Qualify,
	NeedsInfo,
	Qualified,
	Retrieve,
	Analyze,
	Rank,
	Done,
}
impl PipelineState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::Qualify => "qualify",
			Self::NeedsInfo => "needs_info",
			Self::Qualified => "qualified",
			Self::Retrieve => "retrieve",
			Self::Analyze => "analyze",
			Self::Rank => "rank",
			Self::Done => "done",
		}
	}
}

/// One conversational turn. `additional_text` answers the questions of a previous turn and is
/// appended to the pending `query`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnRequest {
	pub query: String,
	#[serde(default)]
	pub additional_text: Option<String>,
	#[serde(default)]
	pub k: Option<u32>,
}

/// A search that skips qualification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub item_title: String,
	#[serde(default)]
	pub preferences: Vec<String>,
	#[serde(default)]
	pub k: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnOutcome {
	NeedsMoreInfo { pending_query: String, questions: Vec<String>, source: QualificationSource },
	NoResults { query: StructuredQuery },
	Recommendations { query: StructuredQuery, recommendations: Vec<Recommendation> },
	TryAgain { message: String },
}

struct Run {
	state: PipelineState,
}
impl Run {
	fn new() -> Self {
		Self { state: PipelineState::Start }
	}

	fn advance(&mut self, next: PipelineState) {
		tracing::info!(from = self.state.as_str(), to = next.as_str(), "Pipeline transition.");

		self.state = next;
	}
}

impl BazaarService {
	/// Runs one turn: qualify, then search when the query is sufficient.
	///
	/// Only an empty query is returned as an error. Stage failures become
	/// [`TurnOutcome::TryAgain`].
	pub async fn turn(&self, req: TurnRequest) -> Result<TurnOutcome> {
		let query = pending_query(&req.query, req.additional_text.as_deref());

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let mut run = Run::new();

		run.advance(PipelineState::Qualify);

		let qualification = match self.qualify(&query).await {
			Ok(qualification) => qualification,
			Err(err) => return Ok(try_again(&mut run, err)),
		};

		match qualification {
			Qualification::NeedsMoreInfo { questions, source } => {
				run.advance(PipelineState::NeedsInfo);

				Ok(TurnOutcome::NeedsMoreInfo { pending_query: query, questions, source })
			},
			Qualification::Sufficient { query, .. } => {
				run.advance(PipelineState::Qualified);

				Ok(self.run_search(&mut run, query, req.k).await)
			},
		}
	}

	/// Searches with an already structured query.
	pub async fn search(&self, req: SearchRequest) -> Result<TurnOutcome> {
		let query = StructuredQuery::new(&req.item_title, &req.preferences, 0)
			.map_err(|err| Error::InvalidRequest { message: err.message })?;
		let mut run = Run::new();

		run.advance(PipelineState::Qualified);

		Ok(self.run_search(&mut run, query, req.k).await)
	}

	async fn run_search(
		&self,
		run: &mut Run,
		query: StructuredQuery,
		k: Option<u32>,
	) -> TurnOutcome {
		run.advance(PipelineState::Retrieve);

		let candidates = match self.retrieve(&query, k).await {
			Ok(candidates) => candidates,
			Err(err) => return try_again(run, err),
		};

		if candidates.is_empty() {
			run.advance(PipelineState::Done);

			return TurnOutcome::NoResults { query };
		}

		run.advance(PipelineState::Analyze);

		let analyses = match self.analyze(&query, &candidates).await {
			Ok(Analysis::Analyzed(analyses)) => analyses,
			Ok(Analysis::NoCandidates) => {
				run.advance(PipelineState::Done);

				return TurnOutcome::NoResults { query };
			},
			Err(err) => return try_again(run, err),
		};

		run.advance(PipelineState::Rank);

		let recommendations = match self.rank(&query, &candidates, &analyses).await {
			Ok(recommendations) => recommendations,
			Err(err) => return try_again(run, err),
		};

		run.advance(PipelineState::Done);

		if recommendations.is_empty() {
			return TurnOutcome::NoResults { query };
		}

		TurnOutcome::Recommendations { query, recommendations }
	}
}

fn pending_query(query: &str, additional_text: Option<&str>) -> String {
	let query = query.trim();

	match additional_text.map(str::trim).filter(|text| !text.is_empty()) {
		Some(text) if query.is_empty() => text.to_string(),
		Some(text) => format!("{query} {text}"),
		None => query.to_string(),
	}
}

fn try_again(run: &mut Run, err: Error) -> TurnOutcome {
	tracing::warn!(error = %err, stage = run.state.as_str(), "Pipeline stage failed.");

	run.advance(PipelineState::Done);

	TurnOutcome::TryAgain { message: TRY_AGAIN_MESSAGE.to_string() }
}
