use serde_json::Value;

use crate::{Error, Result};

/// One entry of a hosted rerank response, in the service's relevance order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RerankResult {
	pub index: usize,
	pub relevance_score: f32,
}

/// Scores every document against the query with a cross-encoder endpoint.
///
/// The returned scores are aligned with `docs` by position.
pub async fn score(
	cfg: &aila_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "texts": docs, "raw_scores": false });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_score_response(json, docs.len())
}

/// Submits the whole batch to a hosted rerank service and returns at most `top_n` results.
pub async fn rerank(
	cfg: &aila_config::ProviderConfig,
	query: &str,
	docs: &[String],
	top_n: usize,
) -> Result<Vec<RerankResult>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_n": top_n,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn result_items(json: &Value) -> Result<&Vec<Value>> {
	json.as_array()
		.or_else(|| json.get("results").and_then(|v| v.as_array()))
		.or_else(|| json.get("data").and_then(|v| v.as_array()))
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank response is missing results array.".to_string(),
		})
}

fn parse_item(item: &Value) -> Result<RerankResult> {
	let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
		Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
	})? as usize;
	let relevance_score = item
		.get("relevance_score")
		.or_else(|| item.get("score"))
		.and_then(|v| v.as_f64())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank result missing score.".to_string(),
		})? as f32;

	Ok(RerankResult { index, relevance_score })
}

fn parse_score_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores: Vec<Option<f32>> = vec![None; doc_count];

	for item in result_items(&json)? {
		let result = parse_item(item)?;

		if let Some(slot) = scores.get_mut(result.index) {
			*slot = Some(result.relevance_score);
		}
	}

	scores
		.into_iter()
		.collect::<Option<Vec<_>>>()
		.ok_or_else(|| Error::InvalidResponse {
			message: "Score response did not cover every document.".to_string(),
		})
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<RerankResult>> {
	let mut out = Vec::new();

	for item in result_items(&json)? {
		let result = parse_item(item)?;

		if result.index >= doc_count {
			tracing::warn!(index = result.index, doc_count, "Rerank result index out of range.");

			continue;
		}

		out.push(result);
	}

	Ok(out)
}
