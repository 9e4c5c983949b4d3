use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Clone, Debug, Deserialize, PartialEq, serde::Serialize)]
pub struct SearchHit {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub score: f32,
	#[serde(default)]
	pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	results: Vec<SearchHit>,
}

pub async fn search(
	cfg: &aila_config::WebSearchProviderConfig,
	query: &str,
	max_results: u32,
) -> Result<Vec<SearchHit>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": query,
		"max_results": max_results,
		"search_depth": cfg.search_depth,
		"include_answer": false,
		"include_raw_content": false,
		"include_images": false,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_search_response(json, max_results as usize)
}

fn parse_search_response(json: Value, max_results: usize) -> Result<Vec<SearchHit>> {
	let parsed: SearchResponse = serde_json::from_value(json).map_err(|err| {
		Error::InvalidResponse { message: format!("Search response is malformed: {err}") }
	})?;
	let mut hits = parsed.results;

	hits.truncate(max_results);

	Ok(hits)
}
