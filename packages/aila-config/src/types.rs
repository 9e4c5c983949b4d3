use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub reranker: Reranker,
	#[serde(default)]
	pub pipeline: Pipeline,
	pub indexes: Vec<IndexConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub generation: LlmProviderConfig,
	pub web_search: WebSearchProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: Option<u32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebSearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	#[serde(default = "default_search_max_results")]
	pub max_results: u32,
	/// Mirrors the provider's `search_depth` knob, e.g. "basic" or "advanced".
	#[serde(default = "default_search_depth")]
	pub search_depth: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Reranker {
	/// Either "local" or "hosted". Exactly one strategy is active per deployment.
	pub strategy: String,
	#[serde(default = "default_top_n")]
	pub top_n: u32,
	pub local: Option<ProviderConfig>,
	pub hosted: Option<ProviderConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	/// ISO 639-1 code of the language every downstream stage works in.
	pub working_language: String,
	/// Detections below this confidence keep the working language. Short queries score low.
	pub min_language_confidence: f64,
	pub max_concurrency: u32,
	pub expansion_max_attempts: u32,
	/// Either "original" (variant 0 text) or "variant" (the classified variant's own text).
	pub retrieval_query: String,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			working_language: "en".to_string(),
			min_language_confidence: 0.5,
			max_concurrency: 3,
			expansion_max_attempts: 3,
			retrieval_query: "original".to_string(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct IndexConfig {
	pub name: String,
	pub collection: String,
	#[serde(default = "default_index_top_k")]
	pub top_k: u32,
	/// Payload key holding the chunk text. Every other payload key becomes metadata.
	#[serde(default = "default_text_field")]
	pub text_field: String,
	pub vector_name: Option<String>,
	pub embedding: EmbeddingProviderConfig,
}

fn default_search_max_results() -> u32 {
	5
}

fn default_search_depth() -> String {
	"basic".to_string()
}

fn default_top_n() -> u32 {
	10
}

fn default_index_top_k() -> u32 {
	10
}

fn default_text_field() -> String {
	"text".to_string()
}
