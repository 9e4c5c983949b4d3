use serde::Deserialize;
use serde_json::Value;

use aila_domain::knowledge;

use crate::{Pipeline, Result, VariantMap, fanout, prompts, workflow::Stage};

#[derive(Debug, Deserialize)]
struct ClassificationOutput {
	categories: Vec<String>,
}

impl Pipeline {
	/// Classifies every variant concurrently. A failed task yields a null classification.
	pub async fn classify_all(
		&self,
		variants: &VariantMap<String>,
	) -> Result<VariantMap<Option<Vec<String>>>> {
		fanout::fan_out(
			Stage::Classify,
			self.concurrency(),
			variants.keys(),
			|variant| {
				let pipeline = self.clone();
				let text = variants.get(variant).cloned().unwrap_or_default();

				async move { pipeline.classify_variant(variant, &text).await }
			},
			|_| None,
		)
		.await
	}

	/// Resolves one variant to the index names it should be retrieved from.
	///
	/// Returns `None` when the model output is unusable or names no known domain.
	pub async fn classify_variant(&self, variant: usize, text: &str) -> Result<Option<Vec<String>>> {
		let messages = prompts::classification_messages(text);
		let schema = prompts::classification_schema();
		let raw = self
			.providers
			.generator
			.generate_structured(
				&self.cfg.providers.generation,
				&messages,
				prompts::CLASSIFICATION_SCHEMA_NAME,
				&schema,
			)
			.await?;
		let indexes = parse_classification(raw);

		match &indexes {
			Some(names) => tracing::info!(variant, indexes = ?names, "Variant classified."),
			None => tracing::info!(variant, "Variant matched no knowledge domain."),
		}

		Ok(indexes)
	}
}

fn parse_classification(raw: Value) -> Option<Vec<String>> {
	let output: ClassificationOutput = match serde_json::from_value(raw) {
		Ok(output) => output,
		Err(err) => {
			tracing::warn!(error = %err, "Classification output is malformed.");

			return None;
		},
	};

	knowledge::resolve_indexes(&output.categories)
}
