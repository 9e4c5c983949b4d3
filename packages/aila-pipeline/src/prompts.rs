//! Fixed instructions and response schemas for every generation call the pipeline makes.

use serde_json::{Value, json};

use aila_domain::knowledge::KnowledgeDomain;

pub const EXPANSION_SCHEMA_NAME: &str = "query_expansion";
pub const CLASSIFICATION_SCHEMA_NAME: &str = "domain_classification";

const TRANSLATION_INSTRUCTIONS: &str = "You are a careful legal assistant. Translate the user's legal query into {language}. \
Preserve its meaning, legal terminology and nuance. Reply with the translation only, without \
explanations or annotations.";

const EXPANSION_INSTRUCTIONS: &str = "Rewrite the user's query into exactly 2 variations that mean the same thing but are \
phrased differently.\n\
- Keep the original intent.\n\
- Vary vocabulary and sentence structure.\n\
- Keep each rewrite short and clear.\n\
- Do not copy phrases from the original query verbatim.\n\
Return JSON with a `paraphrases` array of two strings.";

const CLASSIFICATION_INSTRUCTIONS: &str = "You are a legal assistant. Classify the user's query into one or more of these legal \
categories: {labels}. Decide from the subject and context of the query. Return JSON with a \
`categories` array; return an empty array when no category applies.";

/// Few-shot pairs shown to the classifier before the real query.
const CLASSIFICATION_EXAMPLES: &[(&str, &[KnowledgeDomain])] = &[
	("What is phishing?", &[KnowledgeDomain::Phishing]),
	("What is GDPR?", &[KnowledgeDomain::Gdpr]),
	("How is phishing punished under Greek legislation?", &[KnowledgeDomain::PenalCode]),
	(
		"What is phishing and give me an example of such a case.",
		&[KnowledgeDomain::Phishing, KnowledgeDomain::LegalCases],
	),
];

const SUMMARY_INSTRUCTIONS: &str = "You are a legal assistant who gives accurate, well-reasoned answers grounded in the \
provided context. Summarize the context below with respect to the user query. Keep the \
information that helps answer the query and keep the related metadata{metadata_note}.";

pub fn translation_messages(query: &str, target_language: &str) -> Vec<Value> {
	vec![
		json!({
			"role": "system",
			"content": TRANSLATION_INSTRUCTIONS.replace("{language}", target_language),
		}),
		json!({ "role": "user", "content": query }),
	]
}

pub fn expansion_messages(query: &str) -> Vec<Value> {
	vec![
		json!({ "role": "system", "content": EXPANSION_INSTRUCTIONS }),
		json!({ "role": "user", "content": query }),
	]
}

pub fn expansion_schema() -> Value {
	json!({
		"type": "object",
		"properties": {
			"paraphrases": {
				"type": "array",
				"items": { "type": "string" },
				"minItems": 2,
				"maxItems": 2,
			},
		},
		"required": ["paraphrases"],
		"additionalProperties": false,
	})
}

/// Builds the classifier conversation. The query under test is always the last user turn.
pub fn classification_messages(query: &str) -> Vec<Value> {
	let labels = KnowledgeDomain::ALL
		.iter()
		.map(|domain| format!("\"{}\"", domain.label()))
		.collect::<Vec<_>>()
		.join(", ");
	let mut messages = vec![json!({
		"role": "system",
		"content": CLASSIFICATION_INSTRUCTIONS.replace("{labels}", &labels),
	})];

	for (example, domains) in CLASSIFICATION_EXAMPLES {
		let categories: Vec<&str> = domains.iter().map(|domain| domain.label()).collect();

		messages.push(json!({ "role": "user", "content": example }));
		messages.push(json!({
			"role": "assistant",
			"content": json!({ "categories": categories }).to_string(),
		}));
	}

	messages.push(json!({ "role": "user", "content": query }));

	messages
}

pub fn classification_schema() -> Value {
	let labels: Vec<&str> = KnowledgeDomain::ALL.iter().map(|domain| domain.label()).collect();

	json!({
		"type": "object",
		"properties": {
			"categories": {
				"type": "array",
				"items": { "type": "string", "enum": labels },
			},
		},
		"required": ["categories"],
		"additionalProperties": false,
	})
}

/// Summarization request over a digest of retrieved documents or search results.
pub fn summary_messages(query: &str, digest: &str, keep_metadata_in_response: bool) -> Vec<Value> {
	let metadata_note = if keep_metadata_in_response { " in the summarized response" } else { "" };

	vec![
		json!({
			"role": "system",
			"content": SUMMARY_INSTRUCTIONS.replace("{metadata_note}", metadata_note),
		}),
		json!({
			"role": "user",
			"content": format!("Context:\n{digest}\n\nUser query: {query}"),
		}),
	]
}
