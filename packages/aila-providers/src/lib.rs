pub mod embedding;
pub mod generation;
pub mod rerank;
pub mod web_search;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

const MAX_ERROR_BODY_CHARS: usize = 512;
const QUOTA_ERROR_CODES: [&str; 3] = ["insufficient_quota", "rate_limit_exceeded", "quota_exceeded"];

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

/// Maps non-success responses to typed errors, classifying quota exhaustion separately.
pub(crate) async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();

	Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &str) -> Error {
	let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();

	if status == StatusCode::TOO_MANY_REQUESTS || body_has_quota_code(body) {
		return Error::QuotaExhausted { message };
	}

	Error::Status { status: status.as_u16(), message }
}

fn body_has_quota_code(body: &str) -> bool {
	let Ok(json) = serde_json::from_str::<Value>(body) else {
		return false;
	};
	let error = json.get("error").unwrap_or(&json);

	["code", "type"].iter().filter_map(|key| error.get(*key).and_then(Value::as_str)).any(
		|code| QUOTA_ERROR_CODES.contains(&code),
	)
}
