pub mod aggregate;
pub mod answer;
pub mod classify;
pub mod expand;
pub mod preprocess;
pub mod prompts;
pub mod rerank;
pub mod retrieve;
pub mod state;
pub mod web_search;
pub mod workflow;

mod error;
mod fanout;
mod retry;

pub use answer::{AnswerEvent, AnswerStream, ChatTurn, ConversationHistory, Role};
pub use error::{Error, Result};
pub use preprocess::{LanguageDetector, Preprocessed, WhatlangDetector};
pub use rerank::RerankStrategy;
pub use retry::RetryPolicy;
pub use state::{PipelineState, VARIANT_COUNT, VariantMap};
pub use workflow::{RunOutput, Stage, StageRecord, WorkflowRun};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use aila_config::{Config, LlmProviderConfig, ProviderConfig, WebSearchProviderConfig};
use aila_domain::language::{self, Language};
use aila_index::IndexRegistry;
use aila_providers::{
	generation::{self, TextStream},
	rerank::{self as rerank_api, RerankResult},
	web_search::{self as web_search_api, SearchHit},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Generator
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<String>>;

	fn generate_structured<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		schema_name: &'a str,
		schema: &'a Value,
	) -> BoxFuture<'a, aila_providers::Result<Value>>;

	fn generate_stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<TextStream>>;
}

pub trait WebSearcher
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a WebSearchProviderConfig,
		query: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, aila_providers::Result<Vec<SearchHit>>>;
}

/// Cross-encoder that scores every candidate; ranking happens on our side.
pub trait LocalScorer
where
	Self: Send + Sync,
{
	fn predict<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, aila_providers::Result<Vec<f32>>>;
}

/// Hosted service that ranks a batch and returns the top results by candidate index.
pub trait RerankService
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, aila_providers::Result<Vec<RerankResult>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub generator: Arc<dyn Generator>,
	pub web_search: Arc<dyn WebSearcher>,
	pub local_scorer: Arc<dyn LocalScorer>,
	pub rerank: Arc<dyn RerankService>,
}
impl Providers {
	pub fn new(
		generator: Arc<dyn Generator>,
		web_search: Arc<dyn WebSearcher>,
		local_scorer: Arc<dyn LocalScorer>,
		rerank: Arc<dyn RerankService>,
	) -> Self {
		Self { generator, web_search, local_scorer, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			generator: provider.clone(),
			web_search: provider.clone(),
			local_scorer: provider.clone(),
			rerank: provider,
		}
	}
}

/// Application context built once at startup and shared by every run.
///
/// Cloning is cheap; fan-out tasks each hold their own clone.
#[derive(Clone)]
pub struct Pipeline {
	pub cfg: Arc<Config>,
	pub registry: Arc<IndexRegistry>,
	pub reranker: Arc<RerankStrategy>,
	pub providers: Providers,
	pub detector: Arc<dyn LanguageDetector>,
	working_language: Language,
}
impl Pipeline {
	pub fn new(cfg: Config, registry: IndexRegistry) -> Result<Self> {
		Self::with_providers(cfg, registry, Providers::default())
	}

	pub fn with_providers(cfg: Config, registry: IndexRegistry, providers: Providers) -> Result<Self> {
		let working_language =
			language::by_code(&cfg.pipeline.working_language).ok_or_else(|| Error::InvalidConfig {
				message: format!(
					"Working language {:?} is not supported.",
					cfg.pipeline.working_language
				),
			})?;

		registry
			.ensure_covers(aila_domain::knowledge::index_universe())
			.map_err(|err| Error::InvalidConfig { message: err.to_string() })?;

		let reranker = RerankStrategy::from_config(&cfg.reranker, &providers)?;

		Ok(Self {
			cfg: Arc::new(cfg),
			registry: Arc::new(registry),
			reranker: Arc::new(reranker),
			providers,
			detector: Arc::new(WhatlangDetector),
			working_language,
		})
	}

	/// Replaces the language detector used by preprocessing.
	pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
		self.detector = detector;

		self
	}

	pub fn working_language(&self) -> Language {
		self.working_language
	}

	pub(crate) fn concurrency(&self) -> usize {
		self.cfg.pipeline.max_concurrency.max(1) as usize
	}
}

struct DefaultProviders;
impl Generator for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<String>> {
		Box::pin(generation::generate(cfg, messages))
	}

	fn generate_structured<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		schema_name: &'a str,
		schema: &'a Value,
	) -> BoxFuture<'a, aila_providers::Result<Value>> {
		Box::pin(generation::generate_structured(cfg, messages, schema_name, schema))
	}

	fn generate_stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<TextStream>> {
		Box::pin(generation::generate_stream(cfg, messages))
	}
}
impl WebSearcher for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a WebSearchProviderConfig,
		query: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, aila_providers::Result<Vec<SearchHit>>> {
		Box::pin(web_search_api::search(cfg, query, max_results))
	}
}
impl LocalScorer for DefaultProviders {
	fn predict<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, aila_providers::Result<Vec<f32>>> {
		Box::pin(rerank_api::score(cfg, query, docs))
	}
}
impl RerankService for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, aila_providers::Result<Vec<RerankResult>>> {
		Box::pin(rerank_api::rerank(cfg, query, docs, top_n))
	}
}
