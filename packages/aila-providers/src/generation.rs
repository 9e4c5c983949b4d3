use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::{Error, Result};

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Plain-text chat completion.
pub async fn generate(cfg: &aila_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let json = post_completion(cfg, &body).await?;

	message_content(&json).map(|content| content.trim().to_string())
}

/// Chat completion constrained to a JSON schema; returns the decoded JSON object.
pub async fn generate_structured(
	cfg: &aila_config::LlmProviderConfig,
	messages: &[Value],
	schema_name: &str,
	schema: &Value,
) -> Result<Value> {
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": {
			"type": "json_schema",
			"json_schema": { "name": schema_name, "strict": true, "schema": schema },
		},
	});
	let json = post_completion(cfg, &body).await?;

	parse_structured_content(&json)
}

/// Streaming chat completion; yields content deltas until the provider signals completion.
pub async fn generate_stream(
	cfg: &aila_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<TextStream> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"stream": true,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let mut bytes = Box::pin(crate::check_status(res).await?.bytes_stream());
	let stream = async_stream::stream! {
		let mut decoder = SseDecoder::default();

		'read: while let Some(chunk) = bytes.next().await {
			let chunk = match chunk {
				Ok(chunk) => chunk,
				Err(err) => {
					yield Err(Error::from(err));

					break 'read;
				},
			};

			for event in decoder.push(&chunk) {
				match event {
					SseEvent::Done => break 'read,
					SseEvent::Data(data) => match parse_stream_delta(&data) {
						Ok(Some(delta)) => {
							yield Ok(delta);
						},
						Ok(None) => {},
						Err(err) => {
							yield Err(err);

							break 'read;
						},
					},
				}
			}
		}
	};

	Ok(Box::pin(stream))
}

async fn post_completion(cfg: &aila_config::LlmProviderConfig, body: &Value) -> Result<Value> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(body)
		.send()
		.await?;

	Ok(crate::check_status(res).await?.json().await?)
}

fn message_content(json: &Value) -> Result<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})
}

fn parse_structured_content(json: &Value) -> Result<Value> {
	let content = message_content(json)?;
	let parsed: Value = serde_json::from_str(content.trim()).map_err(|_| {
		Error::InvalidResponse { message: "Completion content is not valid JSON.".to_string() }
	})?;

	if !parsed.is_object() {
		return Err(Error::InvalidResponse {
			message: "Completion content must be a JSON object.".to_string(),
		});
	}

	Ok(parsed)
}

fn parse_stream_delta(data: &str) -> Result<Option<String>> {
	let json: Value = serde_json::from_str(data)?;

	if let Some(error) = json.get("error") {
		let message = error.get("message").and_then(Value::as_str).unwrap_or("stream error");
		let code = error.get("code").and_then(Value::as_str).unwrap_or_default();

		if matches!(code, "insufficient_quota" | "rate_limit_exceeded") {
			return Err(Error::QuotaExhausted { message: message.to_string() });
		}

		return Err(Error::InvalidResponse { message: message.to_string() });
	}

	Ok(json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|c| c.as_str())
		.filter(|content| !content.is_empty())
		.map(str::to_string))
}

#[derive(Debug, PartialEq)]
enum SseEvent {
	Data(String),
	Done,
}

/// Incremental server-sent-events decoder.
///
/// Bytes are buffered until a full line arrives so multi-byte characters split across chunks
/// decode correctly.
#[derive(Default)]
struct SseDecoder {
	buf: Vec<u8>,
}
impl SseDecoder {
	fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
		self.buf.extend_from_slice(chunk);

		let mut events = Vec::new();

		while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
			let line: Vec<u8> = self.buf.drain(..=pos).collect();
			let line = String::from_utf8_lossy(&line);
			let line = line.trim_end_matches(['\r', '\n']);
			let Some(data) = line.strip_prefix("data:") else {
				continue;
			};
			let data = data.trim_start();

			if data == "[DONE]" {
				events.push(SseEvent::Done);
			} else if !data.is_empty() {
				events.push(SseEvent::Data(data.to_string()));
			}
		}

		events
	}
}
