use futures::future;

use aila_domain::document::{IndexHit, RankedDocument};

use crate::{Error, Pipeline, Result, VariantMap, fanout, workflow::Stage};

/// Which text each variant sends to the indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrievalQuery {
	/// Always the working query (variant 0).
	Original,
	/// The variant's own text.
	Variant,
}
impl RetrievalQuery {
	pub fn from_config(raw: &str) -> Result<Self> {
		match raw {
			"original" => Ok(Self::Original),
			"variant" => Ok(Self::Variant),
			other => Err(Error::InvalidConfig {
				message: format!("Unknown retrieval query mode {other:?}."),
			}),
		}
	}
}

impl Pipeline {
	/// Retrieves and reranks documents for every classified variant.
	///
	/// Unclassified variants stay `None`. A failed task degrades to an empty list.
	pub async fn retrieve_all(
		&self,
		variants: &VariantMap<String>,
		classification: &VariantMap<Option<Vec<String>>>,
	) -> Result<VariantMap<Option<Vec<RankedDocument>>>> {
		let mode = RetrievalQuery::from_config(&self.cfg.pipeline.retrieval_query)?;
		let original = variants.get(0).cloned().unwrap_or_default();
		let classified = |variant: usize| matches!(classification.get(variant), Some(Some(_)));

		fanout::fan_out(
			Stage::Retrieve,
			self.concurrency(),
			classification.keys(),
			|variant| {
				let pipeline = self.clone();
				let indexes = classification.get(variant).cloned().flatten();
				let query = match mode {
					RetrievalQuery::Original => original.clone(),
					RetrievalQuery::Variant => variants.get(variant).cloned().unwrap_or_default(),
				};

				async move {
					match indexes {
						Some(indexes) => Ok(Some(pipeline.retrieve_variant(variant, &query, &indexes).await?)),
						None => Ok(None),
					}
				}
			},
			|variant| classified(variant).then(Vec::new),
		)
		.await
	}

	/// Queries every named index, pools the candidates and reranks them.
	///
	/// An index that fails is skipped; the remaining indexes still contribute.
	pub async fn retrieve_variant(
		&self,
		variant: usize,
		query: &str,
		indexes: &[String],
	) -> Result<Vec<RankedDocument>> {
		let lookups = indexes.iter().map(|name| async move {
			let registered = self.registry.get(name)?;

			registered.handle.retrieve(query, registered.top_k).await
		});
		let mut candidates: Vec<IndexHit> = Vec::new();

		for (name, outcome) in indexes.iter().zip(future::join_all(lookups).await) {
			match outcome {
				Ok(hits) => {
					tracing::debug!(variant, index = %name, hits = hits.len(), "Index queried.");

					candidates.extend(hits);
				},
				Err(err) => {
					tracing::warn!(variant, index = %name, error = %err, "Index query failed; skipping.");
				},
			}
		}

		let docs = self.reranker.rank(query, candidates).await?;

		tracing::info!(
			variant,
			strategy = self.reranker.name(),
			documents = docs.len(),
			"Variant retrieved."
		);

		Ok(docs)
	}
}
