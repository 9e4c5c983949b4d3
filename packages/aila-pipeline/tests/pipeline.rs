use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use futures::StreamExt;
use serde_json::{Map, Value, json};

use aila_config::{
	Config, EmbeddingProviderConfig, IndexConfig, LlmProviderConfig, Pipeline as PipelineConfig,
	ProviderConfig, Providers as ProviderConfigs, Qdrant, Reranker, Service, Storage,
	WebSearchProviderConfig,
};
use aila_domain::{
	document::{self, IndexHit},
	knowledge,
	language::{Detection, ENGLISH},
};
use aila_index::{IndexHandle, IndexRegistry};
use aila_pipeline::{
	AnswerEvent, BoxFuture, ChatTurn, Error, Generator, LanguageDetector, LocalScorer, Pipeline,
	Providers, RerankService, Role, WebSearcher, WhatlangDetector, prompts,
};
use aila_providers::{generation::TextStream, rerank::RerankResult, web_search::SearchHit};

const QUERY: &str = "What is GDPR?";
const FIRST_PARAPHRASE: &str = "Define the GDPR.";
const SECOND_PARAPHRASE: &str = "Explain the General Data Protection Regulation.";
const GREEK_QUERY: &str = "Ποια είναι η ποινή για το ηλεκτρονικό ψάρεμα στην Ελλάδα;";
const GREEK_TRANSLATION: &str = "What is the penalty for phishing in Greece?";

type ClassifyFn = dyn Fn(&str) -> aila_providers::Result<Value> + Send + Sync;

#[derive(Clone, Copy)]
enum SummaryFailure {
	Upstream,
	Quota,
}
impl SummaryFailure {
	fn error(self) -> aila_providers::Error {
		match self {
			Self::Upstream => aila_providers::Error::Status {
				status: 503,
				message: "Service unavailable.".to_string(),
			},
			Self::Quota => aila_providers::Error::QuotaExhausted {
				message: "insufficient_quota".to_string(),
			},
		}
	}
}

struct ScriptedGenerator {
	classify: Box<ClassifyFn>,
	malformed_expansions: usize,
	document_summary_failure: Option<SummaryFailure>,
	stream_fails: bool,
	expansion_calls: AtomicUsize,
	translation_calls: AtomicUsize,
	summary_calls: AtomicUsize,
	classified_texts: Mutex<Vec<String>>,
}
impl ScriptedGenerator {
	fn new(classify: impl Fn(&str) -> aila_providers::Result<Value> + Send + Sync + 'static) -> Self {
		Self {
			classify: Box::new(classify),
			malformed_expansions: 0,
			document_summary_failure: None,
			stream_fails: false,
			expansion_calls: AtomicUsize::new(0),
			translation_calls: AtomicUsize::new(0),
			summary_calls: AtomicUsize::new(0),
			classified_texts: Mutex::new(Vec::new()),
		}
	}

	fn every_variant(categories: &'static [&'static str]) -> Self {
		Self::new(move |_| Ok(json!({ "categories": categories })))
	}

	fn with_malformed_expansions(mut self, count: usize) -> Self {
		self.malformed_expansions = count;

		self
	}

	/// Fails every summary of retrieved documents; web-search summaries still succeed.
	fn with_document_summary_failure(mut self, failure: SummaryFailure) -> Self {
		self.document_summary_failure = Some(failure);

		self
	}

	fn with_failing_stream(mut self) -> Self {
		self.stream_fails = true;

		self
	}

	fn classified_texts(&self) -> Vec<String> {
		let mut texts = self.classified_texts.lock().expect("Lock must not be poisoned.").clone();

		texts.sort();

		texts
	}
}
impl Generator for ScriptedGenerator {
	fn generate<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<String>> {
		let system = messages[0]["content"].as_str().unwrap_or_default();
		let reply = if system.starts_with("You are a careful legal assistant. Translate") {
			self.translation_calls.fetch_add(1, Ordering::SeqCst);

			Ok(GREEK_TRANSLATION.to_string())
		} else {
			self.summary_calls.fetch_add(1, Ordering::SeqCst);

			let user = messages[1]["content"].as_str().unwrap_or_default();
			let first_line = user.lines().nth(1).unwrap_or_default();

			// Document digests number their lines from 0; search digests start with a title.
			match self.document_summary_failure {
				Some(failure) if first_line.starts_with("0) ") => Err(failure.error()),
				_ => Ok(format!("Summary of {first_line}")),
			}
		};

		Box::pin(async move { reply })
	}

	fn generate_structured<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		schema_name: &'a str,
		_schema: &'a Value,
	) -> BoxFuture<'a, aila_providers::Result<Value>> {
		let query = messages
			.last()
			.and_then(|message| message["content"].as_str())
			.unwrap_or_default()
			.to_string();
		let reply = if schema_name == prompts::EXPANSION_SCHEMA_NAME {
			let call = self.expansion_calls.fetch_add(1, Ordering::SeqCst);

			if call < self.malformed_expansions {
				Ok(json!({ "paraphrases": ["only one"] }))
			} else {
				Ok(json!({ "paraphrases": [FIRST_PARAPHRASE, SECOND_PARAPHRASE] }))
			}
		} else {
			self.classified_texts.lock().expect("Lock must not be poisoned.").push(query.clone());

			(self.classify)(&query)
		};

		Box::pin(async move { reply })
	}

	fn generate_stream<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, aila_providers::Result<TextStream>> {
		let second = if self.stream_fails {
			Err(aila_providers::Error::InvalidResponse { message: "Stream closed early.".to_string() })
		} else {
			Ok("is an EU regulation.".to_string())
		};

		Box::pin(async move {
			let deltas: Vec<aila_providers::Result<String>> = vec![Ok("The GDPR ".to_string()), second];
			let stream: TextStream = Box::pin(futures::stream::iter(deltas));

			Ok(stream)
		})
	}
}

struct FakeSearch {
	fail: bool,
	calls: AtomicUsize,
}
impl FakeSearch {
	fn new(fail: bool) -> Self {
		Self { fail, calls: AtomicUsize::new(0) }
	}
}
impl WebSearcher for FakeSearch {
	fn search<'a>(
		&'a self,
		_cfg: &'a WebSearchProviderConfig,
		query: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, aila_providers::Result<Vec<SearchHit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let reply = if self.fail {
			Err(aila_providers::Error::Status { status: 502, message: "Bad gateway.".to_string() })
		} else {
			Ok((0..max_results.min(2))
				.map(|i| SearchHit {
					title: format!("Result {i} for {query}"),
					content: "Web content.".to_string(),
					score: 0.9 - i as f32 * 0.1,
					url: format!("https://example.org/{i}"),
				})
				.collect())
		};

		Box::pin(async move { reply })
	}
}

/// Scores by candidate position so the expected order is easy to predict.
struct PositionScorer;
impl LocalScorer for PositionScorer {
	fn predict<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, aila_providers::Result<Vec<f32>>> {
		let scores = (0..docs.len()).map(|i| (i % 7) as f32 / 10.0).collect();

		Box::pin(async move { Ok(scores) })
	}
}

/// Returns candidates in reverse order with descending relevance.
struct ReverseRerank;
impl RerankService for ReverseRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, aila_providers::Result<Vec<RerankResult>>> {
		let results = (0..docs.len())
			.rev()
			.take(top_n)
			.enumerate()
			.map(|(rank, index)| RerankResult { index, relevance_score: 1.0 - rank as f32 * 0.05 })
			.collect();

		Box::pin(async move { Ok(results) })
	}
}

struct FailingRerank {
	calls: AtomicUsize,
}
impl RerankService for FailingRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		_docs: &'a [String],
		_top_n: usize,
	) -> BoxFuture<'a, aila_providers::Result<Vec<RerankResult>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			Err(aila_providers::Error::QuotaExhausted { message: "Too many requests.".to_string() })
		})
	}
}

struct FailingScorer;
impl LocalScorer for FailingScorer {
	fn predict<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		_docs: &'a [String],
	) -> BoxFuture<'a, aila_providers::Result<Vec<f32>>> {
		Box::pin(async move {
			Err(aila_providers::Error::Status { status: 500, message: "Model crashed.".to_string() })
		})
	}
}

struct StaticIndex {
	name: &'static str,
	fail: bool,
	calls: Arc<AtomicUsize>,
	queries: Arc<Mutex<Vec<String>>>,
}
impl IndexHandle for StaticIndex {
	fn retrieve<'a>(
		&'a self,
		query: &'a str,
		k: u32,
	) -> BoxFuture<'a, aila_index::Result<Vec<IndexHit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.queries.lock().expect("Lock must not be poisoned.").push(query.to_string());

		let reply = if self.fail {
			Err(aila_index::Error::InvalidResponse(format!("{} is offline.", self.name)))
		} else {
			Ok((0..k.min(8))
				.map(|i| {
					let mut metadata = Map::new();

					metadata.insert("source".to_string(), Value::String(self.name.to_string()));

					IndexHit { text: format!("{} chunk {i}", self.name), metadata }
				})
				.collect())
		};

		Box::pin(async move { reply })
	}
}

struct FixedDetector;
impl LanguageDetector for FixedDetector {
	fn detect(&self, _text: &str) -> Option<Detection> {
		Some(Detection { detector_code: "eng", confidence: 1.0, language: Some(ENGLISH) })
	}
}

struct Harness {
	pipeline: Pipeline,
	generator: Arc<ScriptedGenerator>,
	search: Arc<FakeSearch>,
	index_calls: Arc<AtomicUsize>,
	index_queries: Arc<Mutex<Vec<String>>>,
}

fn provider(model: &str) -> ProviderConfig {
	ProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "test-key".to_string(),
		path: "/".to_string(),
		model: model.to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

fn test_config(strategy: &str) -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { qdrant: Qdrant { url: "http://127.0.0.1:6334".to_string(), api_key: None } },
		providers: ProviderConfigs {
			generation: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-llm".to_string(),
				temperature: 0.7,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			web_search: WebSearchProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/search".to_string(),
				max_results: 5,
				search_depth: "basic".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		reranker: Reranker {
			strategy: strategy.to_string(),
			top_n: 10,
			local: Some(provider("test-cross-encoder")),
			hosted: Some(provider("test-rerank")),
		},
		pipeline: PipelineConfig::default(),
		indexes: knowledge::index_universe()
			.map(|name| IndexConfig {
				name: name.to_string(),
				collection: format!("{name}_chunks"),
				top_k: 10,
				text_field: "text".to_string(),
				vector_name: None,
				embedding: EmbeddingProviderConfig {
					provider_id: "test".to_string(),
					api_base: "http://127.0.0.1:1".to_string(),
					api_key: "test-key".to_string(),
					path: "/embeddings".to_string(),
					model: "test-embedding".to_string(),
					dimensions: None,
					timeout_ms: 1_000,
					default_headers: Map::new(),
				},
			})
			.collect(),
	}
}

fn harness(generator: ScriptedGenerator, search: FakeSearch, strategy: &str, failing: &[&str]) -> Harness {
	harness_with_rerankers(
		generator,
		search,
		strategy,
		failing,
		Arc::new(PositionScorer),
		Arc::new(ReverseRerank),
	)
}

fn harness_with_rerankers(
	generator: ScriptedGenerator,
	search: FakeSearch,
	strategy: &str,
	failing: &[&str],
	local_scorer: Arc<dyn LocalScorer>,
	rerank: Arc<dyn RerankService>,
) -> Harness {
	let generator = Arc::new(generator);
	let search = Arc::new(search);
	let index_calls = Arc::new(AtomicUsize::new(0));
	let index_queries = Arc::new(Mutex::new(Vec::new()));
	let mut registry = IndexRegistry::new();

	for name in knowledge::index_universe() {
		let handle = StaticIndex {
			name,
			fail: failing.contains(&name),
			calls: index_calls.clone(),
			queries: index_queries.clone(),
		};

		registry.insert(name, 10, Arc::new(handle)).expect("Index must register.");
	}

	let providers = Providers::new(generator.clone(), search.clone(), local_scorer, rerank);
	let pipeline = Pipeline::with_providers(test_config(strategy), registry, providers)
		.expect("Pipeline must build.")
		.with_detector(Arc::new(FixedDetector));

	Harness { pipeline, generator, search, index_calls, index_queries }
}

#[tokio::test]
async fn gdpr_query_retrieves_ranked_gdpr_documents() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");
	let state = &run.state;

	assert_eq!(state.variants.get(0).map(String::as_str), Some(QUERY));
	assert_eq!(state.variants.len(), 3);
	assert_eq!(
		state.classification.get(0),
		Some(&Some(vec!["gdpr_recall".to_string(), "gdpr_precision".to_string()]))
	);

	for variant in 0..3 {
		let docs = state
			.retrieved
			.get(variant)
			.and_then(Option::as_ref)
			.expect("Classified variant must have documents.");

		assert!(!docs.is_empty());
		assert!(document::is_well_ranked(docs, 10));
		assert!(docs.iter().all(|doc| doc.content.starts_with("gdpr_")));
	}

	assert!(!state.aggregated_context.is_empty());
	assert!(!state.search_summary.is_empty());
	assert_eq!(h.generator.translation_calls.load(Ordering::SeqCst), 0);
	assert_eq!(h.generator.summary_calls.load(Ordering::SeqCst), 4);
	// Three variants times two GDPR indexes.
	assert_eq!(h.index_calls.load(Ordering::SeqCst), 6);

	let output = run.into_output();

	assert_eq!(output.query, QUERY);
	assert_eq!(output.language, "English");
}

#[tokio::test]
async fn retrieval_uses_the_working_query_for_every_variant() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "local", &[]);

	h.pipeline.run(QUERY, Vec::new()).await.expect("Run must succeed.");

	let queries = h.index_queries.lock().expect("Lock must not be poisoned.").clone();

	assert_eq!(queries.len(), 6);
	assert!(queries.iter().all(|query| query == QUERY));
}

#[tokio::test]
async fn local_strategy_sorts_and_truncates() {
	let h = harness(
		ScriptedGenerator::every_variant(&["GDPR", "Specific Legal Cases"]),
		FakeSearch::new(false),
		"local",
		&[],
	);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");
	let docs = run
		.state
		.retrieved
		.get(1)
		.and_then(Option::as_ref)
		.expect("Variant 1 must have documents.");

	// Four indexes contribute 8 candidates each; only the top 10 survive. Scores cycle through
	// 0.0..=0.6, so four candidates tie at the top and keep their pooled order.
	assert_eq!(docs.len(), 10);
	assert!(document::is_well_ranked(docs, 10));
	assert!(docs[..4].iter().all(|doc| doc.score == 0.6));
	assert_eq!(docs[0].content, "gdpr_recall chunk 6");
	assert_eq!(docs[4].score, 0.5);
}

#[tokio::test]
async fn greek_query_is_translated_before_classification() {
	let h = harness(
		ScriptedGenerator::every_variant(&["Greek Penal Code"]),
		FakeSearch::new(false),
		"hosted",
		&[],
	);
	let pipeline = h.pipeline.clone().with_detector(Arc::new(WhatlangDetector));
	let run = pipeline.execute(GREEK_QUERY, Vec::new()).await.expect("Run must succeed.");

	assert_eq!(run.state.detected_language.name, "Greek");
	assert_eq!(run.state.variants.get(0).map(String::as_str), Some(GREEK_TRANSLATION));
	assert_eq!(h.generator.translation_calls.load(Ordering::SeqCst), 1);
	assert!(h.generator.classified_texts().iter().any(|text| text == GREEK_TRANSLATION));
	assert!(!h.generator.classified_texts().iter().any(|text| text == GREEK_QUERY));

	let output = run.into_output();

	assert_eq!(output.language, "Greek");
	assert_eq!(output.query, GREEK_QUERY);
}

#[tokio::test]
async fn out_of_domain_query_skips_retrieval() {
	let h = harness(ScriptedGenerator::every_variant(&[]), FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute("What's the weather in Athens?", Vec::new()).await.expect("Run must succeed.");

	for variant in 0..3 {
		assert_eq!(run.state.classification.get(variant), Some(&None));
		assert_eq!(run.state.retrieved.get(variant), Some(&None));
		assert_eq!(run.state.per_variant_summary.get(variant).map(String::as_str), Some(""));
	}

	assert_eq!(h.index_calls.load(Ordering::SeqCst), 0);
	assert!(run.state.aggregated_context.is_empty());
	assert!(!run.state.search_summary.is_empty());
}

#[tokio::test]
async fn failing_classification_only_affects_its_variant() {
	let generator = ScriptedGenerator::new(|query| {
		if query == FIRST_PARAPHRASE {
			Err(aila_providers::Error::Status { status: 500, message: "Upstream error.".to_string() })
		} else {
			Ok(json!({ "categories": ["Phishing Scenarios"] }))
		}
	});
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");

	assert_eq!(run.state.classification.get(0), Some(&Some(vec!["phishing".to_string()])));
	assert_eq!(run.state.classification.get(1), Some(&None));
	assert_eq!(run.state.classification.get(2), Some(&Some(vec!["phishing".to_string()])));
	assert_eq!(run.state.retrieved.get(1), Some(&None));
	assert!(run.state.retrieved.get(2).and_then(Option::as_ref).is_some());
}

#[tokio::test]
async fn failing_index_does_not_abort_its_siblings() {
	let h = harness(
		ScriptedGenerator::every_variant(&["GDPR"]),
		FakeSearch::new(false),
		"hosted",
		&["gdpr_recall"],
	);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");
	let docs = run.state.retrieved.get(0).and_then(Option::as_ref).expect("Documents expected.");

	assert_eq!(docs.len(), 8);
	assert!(docs.iter().all(|doc| doc.content.starts_with("gdpr_precision")));
}

#[tokio::test]
async fn expansion_retries_malformed_output() {
	let generator = ScriptedGenerator::every_variant(&["GDPR"]).with_malformed_expansions(2);
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Third attempt must succeed.");

	assert_eq!(h.generator.expansion_calls.load(Ordering::SeqCst), 3);
	assert_eq!(run.state.variants.get(2).map(String::as_str), Some(SECOND_PARAPHRASE));
}

#[tokio::test]
async fn expansion_exhaustion_fails_the_run() {
	let generator = ScriptedGenerator::every_variant(&["GDPR"]).with_malformed_expansions(usize::MAX);
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let err = h.pipeline.run(QUERY, Vec::new()).await.expect_err("Expected expansion failure.");

	assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
	assert_eq!(h.generator.expansion_calls.load(Ordering::SeqCst), 3);
	assert_eq!(h.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quota_exhaustion_is_fatal() {
	let generator = ScriptedGenerator::new(|_| {
		Err(aila_providers::Error::QuotaExhausted { message: "insufficient_quota".to_string() })
	});
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let err = h.pipeline.run(QUERY, Vec::new()).await.expect_err("Expected quota failure.");

	assert!(matches!(err, Error::QuotaExhausted { .. }));
}

#[tokio::test]
async fn search_failure_degrades_to_empty_results() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(true), "hosted", &[]);
	let output = h.pipeline.run(QUERY, Vec::new()).await.expect("Run must succeed.");

	assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
	assert!(output.search_results.is_empty());
	assert!(!output.summarized_context.is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "hosted", &[]);
	let err = h.pipeline.run(" \u{200B} \t", Vec::new()).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(h.search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stage_log_covers_both_branches() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");
	let stages: Vec<&str> = run.stages.iter().map(|record| record.stage.as_str()).collect();

	assert_eq!(stages, vec!["preprocess", "expand", "classify", "retrieve", "aggregate", "web_search"]);
}

#[tokio::test]
async fn answer_stream_ends_with_done() {
	let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "hosted", &[]);
	let history = vec![ChatTurn { role: Role::User, content: "Hello".to_string() }];
	let output = h.pipeline.run(QUERY, history).await.expect("Run must succeed.");
	let events: Vec<AnswerEvent> = h
		.pipeline
		.stream_answer(QUERY, &output)
		.await
		.expect("Stream must open.")
		.map(|event| event.expect("Event must succeed."))
		.collect()
		.await;

	assert_eq!(
		events,
		vec![
			AnswerEvent::Delta { response: "The GDPR ".to_string() },
			AnswerEvent::Delta { response: "is an EU regulation.".to_string() },
			AnswerEvent::Done { status: 200 },
		]
	);
}

#[test]
fn missing_index_fails_startup() {
	let providers = Providers::new(
		Arc::new(ScriptedGenerator::every_variant(&[])),
		Arc::new(FakeSearch::new(false)),
		Arc::new(PositionScorer),
		Arc::new(ReverseRerank),
	);
	let result = Pipeline::with_providers(test_config("hosted"), IndexRegistry::new(), providers);

	assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}

#[tokio::test]
async fn short_english_queries_keep_their_text_with_real_detection() {
	for query in [QUERY, "Define data breach"] {
		let h = harness(ScriptedGenerator::every_variant(&["GDPR"]), FakeSearch::new(false), "hosted", &[]);
		let pipeline = h.pipeline.clone().with_detector(Arc::new(WhatlangDetector));
		let run = pipeline.execute(query, Vec::new()).await.expect("Run must succeed.");

		assert_eq!(run.state.detected_language.name, "English", "query {query:?}");
		assert_eq!(run.state.variants.get(0).map(String::as_str), Some(query));
		assert_eq!(h.generator.translation_calls.load(Ordering::SeqCst), 0);
	}
}

#[tokio::test]
async fn hosted_rerank_failure_empties_each_variant() {
	let rerank = Arc::new(FailingRerank { calls: AtomicUsize::new(0) });
	let h = harness_with_rerankers(
		ScriptedGenerator::every_variant(&["GDPR"]),
		FakeSearch::new(false),
		"hosted",
		&[],
		Arc::new(PositionScorer),
		rerank.clone(),
	);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");

	assert_eq!(rerank.calls.load(Ordering::SeqCst), 3);

	for variant in 0..3 {
		assert_eq!(run.state.retrieved.get(variant), Some(&Some(Vec::new())));
		assert_eq!(run.state.per_variant_summary.get(variant).map(String::as_str), Some(""));
	}

	assert!(run.state.aggregated_context.is_empty());
	assert!(!run.state.search_summary.is_empty());
}

#[tokio::test]
async fn local_scorer_failure_empties_each_variant() {
	let h = harness_with_rerankers(
		ScriptedGenerator::every_variant(&["Phishing Scenarios"]),
		FakeSearch::new(false),
		"local",
		&[],
		Arc::new(FailingScorer),
		Arc::new(ReverseRerank),
	);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");

	for variant in 0..3 {
		assert_eq!(run.state.retrieved.get(variant), Some(&Some(Vec::new())));
	}
}

#[tokio::test]
async fn failing_document_summary_leaves_variant_without_summary() {
	let generator = ScriptedGenerator::every_variant(&["GDPR"])
		.with_document_summary_failure(SummaryFailure::Upstream);
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let run = h.pipeline.execute(QUERY, Vec::new()).await.expect("Run must succeed.");

	for variant in 0..3 {
		assert!(run.state.retrieved.get(variant).and_then(Option::as_ref).is_some());
		assert_eq!(run.state.per_variant_summary.get(variant).map(String::as_str), Some(""));
	}

	assert!(run.state.aggregated_context.is_empty());
	assert!(!run.state.search_summary.is_empty());
	// Three document summaries plus the search summary.
	assert_eq!(h.generator.summary_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn summary_quota_exhaustion_is_fatal() {
	let generator =
		ScriptedGenerator::every_variant(&["GDPR"]).with_document_summary_failure(SummaryFailure::Quota);
	let h = harness(generator, FakeSearch::new(false), "hosted", &[]);
	let err = h.pipeline.run(QUERY, Vec::new()).await.expect_err("Expected quota failure.");

	assert!(matches!(err, Error::QuotaExhausted { .. }));
}

#[tokio::test]
async fn answer_stream_error_is_the_last_item() {
	let h = harness(
		ScriptedGenerator::every_variant(&["GDPR"]).with_failing_stream(),
		FakeSearch::new(false),
		"hosted",
		&[],
	);
	let output = h.pipeline.run(QUERY, Vec::new()).await.expect("Run must succeed.");
	let items: Vec<_> = h
		.pipeline
		.stream_answer(QUERY, &output)
		.await
		.expect("Stream must open.")
		.collect()
		.await;

	assert_eq!(items.len(), 2);
	assert_eq!(
		items[0].as_ref().expect("First delta must succeed."),
		&AnswerEvent::Delta { response: "The GDPR ".to_string() }
	);
	assert!(matches!(items[1], Err(Error::Provider { .. })));
}
