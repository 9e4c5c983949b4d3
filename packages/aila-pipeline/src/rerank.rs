use std::sync::Arc;

use aila_config::{ProviderConfig, Reranker};
use aila_domain::document::{self, IndexHit, RankedDocument};

use crate::{Error, LocalScorer, Providers, RerankService, Result};

/// The reranking backend active for this deployment.
pub enum RerankStrategy {
	/// Scores every candidate, then sorts and truncates locally.
	Local { scorer: Arc<dyn LocalScorer>, cfg: ProviderConfig, top_n: usize },
	/// Delegates ordering and truncation to a hosted rerank service.
	Hosted { service: Arc<dyn RerankService>, cfg: ProviderConfig, top_n: usize },
}
impl RerankStrategy {
	pub fn from_config(cfg: &Reranker, providers: &Providers) -> Result<Self> {
		let top_n = cfg.top_n as usize;
		let missing = |section: &str| Error::InvalidConfig {
			message: format!("reranker.{section} is required for the selected strategy."),
		};

		match cfg.strategy.as_str() {
			"local" => Ok(Self::Local {
				scorer: providers.local_scorer.clone(),
				cfg: cfg.local.clone().ok_or_else(|| missing("local"))?,
				top_n,
			}),
			"hosted" => Ok(Self::Hosted {
				service: providers.rerank.clone(),
				cfg: cfg.hosted.clone().ok_or_else(|| missing("hosted"))?,
				top_n,
			}),
			other => Err(Error::InvalidConfig {
				message: format!("Unknown reranker strategy {other:?}."),
			}),
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Local { .. } => "local",
			Self::Hosted { .. } => "hosted",
		}
	}

	pub fn top_n(&self) -> usize {
		match self {
			Self::Local { top_n, .. } | Self::Hosted { top_n, .. } => *top_n,
		}
	}

	/// Orders `candidates` by relevance to `query` and keeps at most `top_n` of them.
	///
	/// Provider failures come back as non-fatal errors so the caller can degrade the variant.
	pub async fn rank(&self, query: &str, candidates: Vec<IndexHit>) -> Result<Vec<RankedDocument>> {
		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let texts: Vec<String> = candidates.iter().map(|hit| hit.text.clone()).collect();

		match self {
			Self::Local { scorer, cfg, top_n } => {
				let scores = scorer.predict(cfg, query, &texts).await.map_err(rerank_error)?;

				if scores.len() != candidates.len() {
					return Err(Error::Provider {
						message: format!(
							"Scorer returned {} scores for {} candidates.",
							scores.len(),
							candidates.len()
						),
					});
				}

				let docs = candidates
					.into_iter()
					.zip(scores)
					.map(|(hit, score)| RankedDocument::from_hit(hit, score))
					.collect();

				Ok(document::rank_top_n(docs, *top_n))
			},
			Self::Hosted { service, cfg, top_n } => {
				let results =
					service.rerank(cfg, query, &texts, *top_n).await.map_err(rerank_error)?;
				let mut slots: Vec<Option<IndexHit>> = candidates.into_iter().map(Some).collect();
				let mut docs = Vec::with_capacity(results.len().min(*top_n));

				for result in results {
					match slots.get_mut(result.index).and_then(Option::take) {
						Some(hit) => docs.push(RankedDocument::from_hit(hit, result.relevance_score)),
						None => tracing::warn!(
							index = result.index,
							"Rerank result points at a missing or repeated candidate."
						),
					}
				}

				Ok(document::rank_top_n(docs, *top_n))
			},
		}
	}
}

// Reranker quota or transport failures only cost this variant its documents.
fn rerank_error(err: aila_providers::Error) -> Error {
	Error::Provider { message: err.to_string() }
}
