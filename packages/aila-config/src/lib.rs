mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, IndexConfig, LlmProviderConfig, Pipeline, ProviderConfig,
	Providers, Qdrant, Reranker, Service, Storage, WebSearchProviderConfig,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}

	let generation = &cfg.providers.generation;

	if !generation.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.generation.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&generation.temperature) {
		return Err(Error::Validation {
			message: "providers.generation.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.providers.web_search.max_results == 0 {
		return Err(Error::Validation {
			message: "providers.web_search.max_results must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.providers.web_search.search_depth.as_str(), "basic" | "advanced") {
		return Err(Error::Validation {
			message: "providers.web_search.search_depth must be one of basic or advanced."
				.to_string(),
		});
	}

	validate_reranker(&cfg.reranker)?;
	validate_pipeline(&cfg.pipeline)?;
	validate_indexes(&cfg.indexes)?;

	let mut keys = vec![
		("generation", generation.api_key.as_str()),
		("web_search", cfg.providers.web_search.api_key.as_str()),
	];

	if let Some(hosted) = cfg.reranker.hosted.as_ref() {
		keys.push(("reranker.hosted", hosted.api_key.as_str()));
	}

	for (label, key) in keys {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn validate_reranker(reranker: &Reranker) -> Result<()> {
	match reranker.strategy.as_str() {
		"local" =>
			if reranker.local.is_none() {
				return Err(Error::Validation {
					message: "reranker.local must be set when reranker.strategy is local."
						.to_string(),
				});
			},
		"hosted" =>
			if reranker.hosted.is_none() {
				return Err(Error::Validation {
					message: "reranker.hosted must be set when reranker.strategy is hosted."
						.to_string(),
				});
			},
		_ => {
			return Err(Error::Validation {
				message: "reranker.strategy must be one of local or hosted.".to_string(),
			});
		},
	}

	if reranker.top_n == 0 {
		return Err(Error::Validation {
			message: "reranker.top_n must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_pipeline(pipeline: &Pipeline) -> Result<()> {
	if pipeline.working_language.trim().is_empty() {
		return Err(Error::Validation {
			message: "pipeline.working_language must be non-empty.".to_string(),
		});
	}
	if !pipeline.min_language_confidence.is_finite()
		|| !(0.0..=1.0).contains(&pipeline.min_language_confidence)
	{
		return Err(Error::Validation {
			message: "pipeline.min_language_confidence must be in the range 0.0-1.0.".to_string(),
		});
	}
	if pipeline.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "pipeline.max_concurrency must be greater than zero.".to_string(),
		});
	}
	if pipeline.expansion_max_attempts == 0 {
		return Err(Error::Validation {
			message: "pipeline.expansion_max_attempts must be greater than zero.".to_string(),
		});
	}
	if !matches!(pipeline.retrieval_query.as_str(), "original" | "variant") {
		return Err(Error::Validation {
			message: "pipeline.retrieval_query must be one of original or variant.".to_string(),
		});
	}

	Ok(())
}

fn validate_indexes(indexes: &[IndexConfig]) -> Result<()> {
	if indexes.is_empty() {
		return Err(Error::Validation { message: "indexes must be non-empty.".to_string() });
	}

	let mut seen = HashSet::new();

	for index in indexes {
		if index.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "indexes.name must be non-empty.".to_string(),
			});
		}
		if !seen.insert(index.name.as_str()) {
			return Err(Error::Validation {
				message: format!("indexes.name {} is declared more than once.", index.name),
			});
		}
		if index.collection.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("indexes.{}.collection must be non-empty.", index.name),
			});
		}
		if index.top_k == 0 {
			return Err(Error::Validation {
				message: format!("indexes.{}.top_k must be greater than zero.", index.name),
			});
		}
		if index.embedding.dimensions == Some(0) {
			return Err(Error::Validation {
				message: format!(
					"indexes.{}.embedding.dimensions must be greater than zero.",
					index.name
				),
			});
		}
		if index.embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider indexes.{}.embedding api_key must be non-empty.", index.name),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}

	cfg.pipeline.working_language = cfg.pipeline.working_language.trim().to_lowercase();

	for index in &mut cfg.indexes {
		if index.vector_name.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false) {
			index.vector_name = None;
		}
	}
}
