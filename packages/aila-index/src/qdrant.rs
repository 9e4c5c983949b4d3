use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Qdrant,
	qdrant::{Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind},
};
use serde_json::{Map, Number, Value as JsonValue};

use aila_domain::document::{IndexHit, Metadata};

use crate::{BoxFuture, Error, IndexHandle, Result};

pub fn connect(cfg: &aila_config::Qdrant) -> Result<Qdrant> {
	Ok(Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?)
}

/// Dense-vector index stored in one Qdrant collection.
///
/// The query is embedded with the index's own embedding model, since indexes may be built with
/// different models.
pub struct QdrantIndex {
	client: Arc<Qdrant>,
	name: String,
	collection: String,
	text_field: String,
	vector_name: Option<String>,
	embedding: aila_config::EmbeddingProviderConfig,
}
impl QdrantIndex {
	pub fn new(client: Arc<Qdrant>, cfg: &aila_config::IndexConfig) -> Self {
		Self {
			client,
			name: cfg.name.clone(),
			collection: cfg.collection.clone(),
			text_field: cfg.text_field.clone(),
			vector_name: cfg.vector_name.clone(),
			embedding: cfg.embedding.clone(),
		}
	}

	async fn search(&self, query: &str, k: u32) -> Result<Vec<IndexHit>> {
		let vectors =
			aila_providers::embedding::embed(&self.embedding, std::slice::from_ref(&query.to_string()))
				.await?;
		let vector = vectors.into_iter().next().ok_or_else(|| {
			Error::InvalidResponse("Embedding provider returned no vectors.".to_string())
		})?;
		let mut request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.limit(k as u64)
			.with_payload(true);

		if let Some(vector_name) = self.vector_name.as_ref() {
			request = request.using(vector_name.clone());
		}

		let response = self.client.query(request).await?;
		let hits = points_to_hits(response.result, &self.text_field);

		tracing::debug!(index = %self.name, hits = hits.len(), "Index query finished.");

		Ok(hits)
	}
}
impl IndexHandle for QdrantIndex {
	fn retrieve<'a>(&'a self, query: &'a str, k: u32) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(self.search(query, k))
	}
}

pub(crate) fn points_to_hits(points: Vec<ScoredPoint>, text_field: &str) -> Vec<IndexHit> {
	let mut hits = Vec::with_capacity(points.len());

	for point in points {
		match payload_to_hit(point.payload, text_field) {
			Some(hit) => hits.push(hit),
			None => tracing::warn!(text_field, "Indexed point has no text payload; skipping."),
		}
	}

	hits
}

fn payload_to_hit(mut payload: HashMap<String, Value>, text_field: &str) -> Option<IndexHit> {
	let text = match payload.remove(text_field)?.kind {
		Some(Kind::StringValue(text)) if !text.trim().is_empty() => text,
		_ => return None,
	};
	let mut entries = payload.into_iter().collect::<Vec<_>>();

	entries.sort_by(|a, b| a.0.cmp(&b.0));

	let mut metadata = Metadata::new();

	for (key, value) in entries {
		metadata.insert(key, value_to_json(value));
	}

	Some(IndexHit { text, metadata })
}

fn value_to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(flag),
		Some(Kind::IntegerValue(number)) => JsonValue::from(number),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(number).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(text)) => JsonValue::String(text),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.into_iter().map(|(key, value)| (key, value_to_json(value))).collect::<Map<_, _>>(),
		),
	}
}
