use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use aila_domain::document::RankedDocument;

use crate::{
	ConversationHistory, Pipeline, PipelineState, Result, VariantMap, aggregate,
	answer::ChatTurn,
};

/// Named step of the workflow graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Preprocess,
	Expand,
	Classify,
	Retrieve,
	Aggregate,
	WebSearch,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Preprocess => "preprocess",
			Self::Expand => "expand",
			Self::Classify => "classify",
			Self::Retrieve => "retrieve",
			Self::Aggregate => "aggregate",
			Self::WebSearch => "web_search",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StageRecord {
	pub stage: Stage,
	pub elapsed_ms: u64,
}
impl StageRecord {
	/// Records `stage` as finished now and restarts the clock for the next stage.
	fn finish(stage: Stage, clock: &mut Instant) -> Self {
		let elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

		tracing::info!(stage = stage.as_str(), elapsed_ms, "Stage completed.");

		*clock = Instant::now();

		Self { stage, elapsed_ms }
	}
}

/// Evidence bundle handed to the answer step.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunOutput {
	/// The user query exactly as received.
	pub query: String,
	pub summarized_context: String,
	pub search_results: String,
	/// Display name of the detected language, e.g. "Greek".
	pub language: String,
	pub history: Vec<ChatTurn>,
}

/// Everything one run produced, kept for inspection after completion.
#[derive(Clone, Debug, serde::Serialize)]
pub struct WorkflowRun {
	pub run_id: Uuid,
	pub state: PipelineState,
	pub stages: Vec<StageRecord>,
	pub history: ConversationHistory,
}
impl WorkflowRun {
	pub fn into_output(self) -> RunOutput {
		RunOutput {
			query: self.state.original_query,
			summarized_context: self.state.aggregated_context,
			search_results: self.state.search_summary,
			language: self.state.detected_language.name.to_string(),
			history: self.history,
		}
	}
}

struct ChainOutcome {
	variants: VariantMap<String>,
	classification: VariantMap<Option<Vec<String>>>,
	retrieved: VariantMap<Option<Vec<RankedDocument>>>,
	summaries: VariantMap<String>,
	aggregated: String,
	stages: Vec<StageRecord>,
}

impl Pipeline {
	/// Runs the workflow once and returns the evidence bundle.
	pub async fn run(&self, user_query: &str, history: ConversationHistory) -> Result<RunOutput> {
		Ok(self.execute(user_query, history).await?.into_output())
	}

	/// Runs the workflow once and keeps the full state and stage log.
	///
	/// Preprocessing feeds two concurrent branches: expand, classify, retrieve and aggregate on
	/// one side, web search on the other. The run finishes when both have written their fields.
	pub async fn execute(&self, user_query: &str, history: ConversationHistory) -> Result<WorkflowRun> {
		let run_id = Uuid::new_v4();
		let span = tracing::info_span!("pipeline_run", %run_id);

		async move {
			let mut clock = Instant::now();
			let preprocessed = self.preprocess(user_query).await?;
			let mut stages = vec![StageRecord::finish(Stage::Preprocess, &mut clock)];
			let working_query = preprocessed.working_query.as_str();
			let (chain, (search_summary, search_record)) = tokio::try_join!(
				self.expansion_chain(working_query),
				self.web_search_branch(working_query)
			)?;
			let mut state = PipelineState::new(user_query, preprocessed.language);

			state.variants = chain.variants;
			state.classification = chain.classification;
			state.retrieved = chain.retrieved;
			state.per_variant_summary = chain.summaries;
			state.aggregated_context = chain.aggregated;
			state.search_summary = search_summary;
			state.check_consistency()?;

			stages.extend(chain.stages);
			stages.push(search_record);

			tracing::info!(
				language = state.detected_language.code,
				translated = preprocessed.translated,
				context_chars = state.aggregated_context.len(),
				search_chars = state.search_summary.len(),
				"Pipeline run completed."
			);

			Ok(WorkflowRun { run_id, state, stages, history })
		}
		.instrument(span)
		.await
	}

	async fn expansion_chain(&self, working_query: &str) -> Result<ChainOutcome> {
		let mut clock = Instant::now();
		let mut stages = Vec::with_capacity(4);
		let variants = self.expand(working_query).await?;

		stages.push(StageRecord::finish(Stage::Expand, &mut clock));

		let classification = self.classify_all(&variants).await?;

		stages.push(StageRecord::finish(Stage::Classify, &mut clock));

		let retrieved = self.retrieve_all(&variants, &classification).await?;

		stages.push(StageRecord::finish(Stage::Retrieve, &mut clock));

		let summaries = self.summarize_all(working_query, &retrieved).await?;
		let aggregated = aggregate::aggregate_summaries(&summaries);

		stages.push(StageRecord::finish(Stage::Aggregate, &mut clock));

		Ok(ChainOutcome { variants, classification, retrieved, summaries, aggregated, stages })
	}

	async fn web_search_branch(&self, working_query: &str) -> Result<(String, StageRecord)> {
		let mut clock = Instant::now();
		let summary = self.search_summary(working_query).await?;

		Ok((summary, StageRecord::finish(Stage::WebSearch, &mut clock)))
	}
}
