use serde_json::{Map, Value};

/// Provenance fields attached to an indexed chunk (source, doc type, jurisdiction, title, law and
/// article identifiers).
pub type Metadata = Map<String, Value>;

/// One raw candidate returned by an index before reranking.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct IndexHit {
	pub text: String,
	pub metadata: Metadata,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RankedDocument {
	pub content: String,
	pub metadata: Metadata,
	pub score: f32,
}
impl RankedDocument {
	pub fn from_hit(hit: IndexHit, score: f32) -> Self {
		Self { content: hit.text, metadata: hit.metadata, score }
	}
}

/// Sorts by descending score and keeps at most `top_n` documents.
///
/// NaN scores sort last. The sort is stable, so ties keep their candidate order.
pub fn rank_top_n(mut docs: Vec<RankedDocument>, top_n: usize) -> Vec<RankedDocument> {
	docs.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
		(true, true) => std::cmp::Ordering::Equal,
		(true, false) => std::cmp::Ordering::Greater,
		(false, true) => std::cmp::Ordering::Less,
		(false, false) => b.score.total_cmp(&a.score),
	});
	docs.truncate(top_n);

	docs
}

/// Checks the ranked-list invariant: non-increasing scores and bounded length.
pub fn is_well_ranked(docs: &[RankedDocument], top_n: usize) -> bool {
	docs.len() <= top_n && docs.windows(2).all(|pair| pair[0].score >= pair[1].score)
}
