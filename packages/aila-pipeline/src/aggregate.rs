use aila_domain::document::RankedDocument;

use crate::{Pipeline, Result, VariantMap, fanout, prompts, workflow::Stage};

impl Pipeline {
	/// Summarizes each variant's documents against the working query.
	///
	/// Variants without documents get an empty summary. A failed summarization also degrades to
	/// an empty summary; quota exhaustion still aborts.
	pub async fn summarize_all(
		&self,
		working_query: &str,
		retrieved: &VariantMap<Option<Vec<RankedDocument>>>,
	) -> Result<VariantMap<String>> {
		fanout::fan_out(
			Stage::Aggregate,
			self.concurrency(),
			retrieved.keys(),
			|variant| {
				let pipeline = self.clone();
				let query = working_query.to_string();
				let docs = retrieved.get(variant).cloned().flatten().unwrap_or_default();

				async move {
					if docs.is_empty() {
						return Ok(String::new());
					}

					pipeline.summarize_variant(variant, &query, &docs).await
				}
			},
			|_| String::new(),
		)
		.await
	}

	pub async fn summarize_variant(
		&self,
		variant: usize,
		working_query: &str,
		docs: &[RankedDocument],
	) -> Result<String> {
		let messages = prompts::summary_messages(working_query, &document_digest(docs), false);
		let summary =
			self.providers.generator.generate(&self.cfg.providers.generation, &messages).await?;

		tracing::info!(variant, documents = docs.len(), "Variant summarized.");

		Ok(summary.trim().to_string())
	}
}

/// One line per document: `"{i}) {content} (score:{score}) metadata:{json}"`.
pub fn document_digest(docs: &[RankedDocument]) -> String {
	docs.iter()
		.enumerate()
		.map(|(i, doc)| {
			let metadata = serde_json::to_string(&doc.metadata).unwrap_or_default();

			format!("{i}) {} (score:{}) metadata:{metadata}", doc.content, doc.score)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

/// Joins non-empty summaries in variant order, separated by blank lines.
pub fn aggregate_summaries(summaries: &VariantMap<String>) -> String {
	summaries
		.iter()
		.map(|(_, summary)| summary.as_str())
		.filter(|summary| !summary.is_empty())
		.collect::<Vec<_>>()
		.join("\n\n")
}

#[cfg(test)]
mod tests {
	use serde_json::{Map, Value};

	use aila_domain::document::RankedDocument;

	use super::{aggregate_summaries, document_digest};
	use crate::VariantMap;

	#[test]
	fn digest_numbers_documents_in_rank_order() {
		let mut metadata = Map::new();

		metadata.insert("source".to_string(), Value::String("GDPR".to_string()));

		let docs = vec![
			RankedDocument { content: "Article 4".to_string(), metadata, score: 0.75 },
			RankedDocument { content: "Article 5".to_string(), metadata: Map::new(), score: 0.5 },
		];

		assert_eq!(
			document_digest(&docs),
			"0) Article 4 (score:0.75) metadata:{\"source\":\"GDPR\"}\n1) Article 5 (score:0.5) metadata:{}"
		);
	}

	#[test]
	fn aggregation_keeps_variant_order_and_skips_empty() {
		let summaries: VariantMap<String> = [
			(2, "third".to_string()),
			(0, "first".to_string()),
			(1, String::new()),
		]
		.into_iter()
		.collect();

		assert_eq!(aggregate_summaries(&summaries), "first\n\nthird");
	}

	#[test]
	fn aggregation_of_nothing_is_empty() {
		let summaries: VariantMap<String> = (0..3).map(|v| (v, String::new())).collect();

		assert_eq!(aggregate_summaries(&summaries), "");
	}
}
