use aila_providers::web_search::SearchHit;

use crate::{Pipeline, Result, prompts};

impl Pipeline {
	/// Live web search branch: search, digest and summarize.
	///
	/// Search failures and empty result sets yield an empty summary. Summarization failures
	/// degrade the same way unless the generation quota is exhausted.
	pub async fn search_summary(&self, working_query: &str) -> Result<String> {
		let cfg = &self.cfg.providers.web_search;
		let hits =
			match self.providers.web_search.search(cfg, working_query, cfg.max_results).await {
				Ok(hits) => hits,
				Err(err) => {
					tracing::warn!(error = %err, "Web search failed; continuing without results.");

					return Ok(String::new());
				},
			};

		if hits.is_empty() {
			tracing::info!("Web search returned no results.");

			return Ok(String::new());
		}

		let messages = prompts::summary_messages(working_query, &search_digest(&hits), true);

		match self.providers.generator.generate(&self.cfg.providers.generation, &messages).await {
			Ok(summary) => {
				tracing::info!(results = hits.len(), "Web search summarized.");

				Ok(summary.trim().to_string())
			},
			Err(err) if err.is_quota() => Err(err.into()),
			Err(err) => {
				tracing::warn!(error = %err, "Web search summarization failed.");

				Ok(String::new())
			},
		}
	}
}

/// One line per hit: `"{title}) {content} (score:{score}) metadata:{url}"`.
pub fn search_digest(hits: &[SearchHit]) -> String {
	hits.iter()
		.map(|hit| format!("{}) {} (score:{}) metadata:{}", hit.title, hit.content, hit.score, hit.url))
		.collect::<Vec<_>>()
		.join("\n")
}
