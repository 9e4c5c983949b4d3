use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde_json::{Value, json};

use crate::{Error, Pipeline, Result, RunOutput};

pub type ConversationHistory = Vec<ChatTurn>;

pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<AnswerEvent>> + Send>>;

const ANSWER_INSTRUCTIONS: &str = "You are a legal assistant who gives accurate, well-reasoned and context-aware answers to \
legal questions. Ground your answer in the legal context and web search results below and in \
the conversation so far. Say so when the material does not cover the question.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatTurn {
	pub role: Role,
	pub content: String,
}

/// Incremental answer output. `Done` always comes last on success.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
	Delta { response: String },
	Done { status: u16 },
}

impl Pipeline {
	/// Streams the final answer for `user_message` grounded in a finished run.
	///
	/// A failure after streaming started is yielded as the last item; deltas already sent stay
	/// valid.
	pub async fn stream_answer(&self, user_message: &str, output: &RunOutput) -> Result<AnswerStream> {
		let messages = answer_messages(user_message, output);
		let mut deltas =
			self.providers.generator.generate_stream(&self.cfg.providers.generation, &messages).await?;
		let events = async_stream::stream! {
			let mut failed = false;

			while let Some(item) = deltas.next().await {
				match item {
					Ok(response) => yield Ok(AnswerEvent::Delta { response }),
					Err(err) => {
						tracing::warn!(error = %err, "Answer stream failed.");

						yield Err(Error::from(err));

						failed = true;

						break;
					},
				}
			}

			if !failed {
				yield Ok(AnswerEvent::Done { status: 200 });
			}
		};

		Ok(Box::pin(events))
	}
}

/// System prompt with the evidence bundle, then the history, then the new user message.
pub fn answer_messages(user_message: &str, output: &RunOutput) -> Vec<Value> {
	let section = |text: &str| if text.trim().is_empty() { "(none)".to_string() } else { text.to_string() };
	let system = format!(
		"{ANSWER_INSTRUCTIONS}\n\nLegal context:\n{}\n\nWeb search results:\n{}\n\nAnswer in {}.",
		section(&output.summarized_context),
		section(&output.search_results),
		output.language,
	);
	let mut messages = Vec::with_capacity(output.history.len() + 2);

	messages.push(json!({ "role": "system", "content": system }));
	messages.extend(
		output.history.iter().map(|turn| json!({ "role": turn.role.as_str(), "content": turn.content })),
	);
	messages.push(json!({ "role": "user", "content": user_message }));

	messages
}
