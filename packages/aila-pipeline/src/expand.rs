use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Pipeline, Result, RetryPolicy, VariantMap, prompts, workflow::Stage};

#[derive(Debug, Deserialize)]
struct ExpansionOutput {
	paraphrases: Vec<String>,
}

impl Pipeline {
	/// Produces the three query variants: the working query and two paraphrases.
	///
	/// Malformed model output is retried up to `pipeline.expansion_max_attempts` times.
	pub async fn expand(&self, working_query: &str) -> Result<VariantMap<String>> {
		let policy = RetryPolicy::new(self.cfg.pipeline.expansion_max_attempts);
		let messages = prompts::expansion_messages(working_query);
		let schema = prompts::expansion_schema();
		let generator = &self.providers.generator;
		let cfg = &self.cfg.providers.generation;
		let (messages, schema) = (&messages, &schema);
		let [first, second] = policy
			.run(prompts::EXPANSION_SCHEMA_NAME, |_| async move {
				let raw = generator
					.generate_structured(cfg, messages, prompts::EXPANSION_SCHEMA_NAME, schema)
					.await?;

				parse_expansion(raw)
			})
			.await?;
		let mut variants = VariantMap::new();

		variants.insert_new(Stage::Expand, 0, working_query.to_string())?;
		variants.insert_new(Stage::Expand, 1, first)?;
		variants.insert_new(Stage::Expand, 2, second)?;

		Ok(variants)
	}
}

fn parse_expansion(raw: Value) -> Result<[String; 2]> {
	let output: ExpansionOutput = serde_json::from_value(raw)
		.map_err(|err| Error::InvalidOutput { message: format!("Expansion is malformed: {err}") })?;
	let paraphrases: Vec<String> = output
		.paraphrases
		.into_iter()
		.map(|text| text.trim().to_string())
		.filter(|text| !text.is_empty())
		.collect();

	<[String; 2]>::try_from(paraphrases).map_err(|got| Error::InvalidOutput {
		message: format!("Expected 2 non-empty paraphrases, got {}.", got.len()),
	})
}
