use std::collections::BTreeMap;

use aila_domain::{document::RankedDocument, language::Language};

use crate::{Error, Result, workflow::Stage};

/// Number of query variants per run: the working query plus two paraphrases.
pub const VARIANT_COUNT: usize = 3;

/// Per-variant values keyed by variant index.
///
/// Fan-out stages fill one key per task. Merging is a disjoint-key union: writing a key twice is
/// reported as [`Error::StateConflict`] rather than silently overwritten.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VariantMap<T>(BTreeMap<usize, T>);
impl<T> VariantMap<T> {
	pub fn new() -> Self {
		Self(BTreeMap::new())
	}

	pub fn get(&self, variant: usize) -> Option<&T> {
		self.0.get(&variant)
	}

	pub fn contains(&self, variant: usize) -> bool {
		self.0.contains_key(&variant)
	}

	pub fn keys(&self) -> Vec<usize> {
		self.0.keys().copied().collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
		self.0.iter().map(|(variant, value)| (*variant, value))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn insert_new(&mut self, stage: Stage, variant: usize, value: T) -> Result<()> {
		if self.0.contains_key(&variant) {
			return Err(Error::StateConflict { stage: stage.as_str(), variant });
		}

		self.0.insert(variant, value);

		Ok(())
	}

	pub fn merge_disjoint(mut self, stage: Stage, other: Self) -> Result<Self> {
		for (variant, value) in other.0 {
			self.insert_new(stage, variant, value)?;
		}

		Ok(self)
	}

	/// True when exactly the keys `0..VARIANT_COUNT` are present.
	pub fn covers_all_variants(&self) -> bool {
		self.0.len() == VARIANT_COUNT && (0..VARIANT_COUNT).all(|variant| self.0.contains_key(&variant))
	}
}
impl<T> Default for VariantMap<T> {
	fn default() -> Self {
		Self::new()
	}
}
impl<T> FromIterator<(usize, T)> for VariantMap<T> {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (usize, T)>,
	{
		Self(iter.into_iter().collect())
	}
}

/// Mutable record owned by one workflow run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PipelineState {
	pub original_query: String,
	pub detected_language: Language,
	pub variants: VariantMap<String>,
	pub classification: VariantMap<Option<Vec<String>>>,
	pub retrieved: VariantMap<Option<Vec<RankedDocument>>>,
	pub per_variant_summary: VariantMap<String>,
	pub search_summary: String,
	pub aggregated_context: String,
}
impl PipelineState {
	pub fn new(original_query: impl Into<String>, detected_language: Language) -> Self {
		Self {
			original_query: original_query.into(),
			detected_language,
			variants: VariantMap::new(),
			classification: VariantMap::new(),
			retrieved: VariantMap::new(),
			per_variant_summary: VariantMap::new(),
			search_summary: String::new(),
			aggregated_context: String::new(),
		}
	}

	/// Verifies that a finished run left no dangling partial state.
	pub fn check_consistency(&self) -> Result<()> {
		for (label, covered) in [
			("variants", self.variants.covers_all_variants()),
			("classification", self.classification.covers_all_variants()),
			("retrieved", self.retrieved.covers_all_variants()),
			("per_variant_summary", self.per_variant_summary.covers_all_variants()),
		] {
			if !covered {
				return Err(Error::InconsistentState {
					variant: VARIANT_COUNT,
					message: format!("{label} does not cover every variant."),
				});
			}
		}

		for variant in 0..VARIANT_COUNT {
			let unclassified = matches!(self.classification.get(variant), Some(None));
			let retrieved = self.retrieved.get(variant).and_then(Option::as_ref);
			let summary = self.per_variant_summary.get(variant).map(String::as_str).unwrap_or_default();

			if unclassified && retrieved.is_some() {
				return Err(Error::InconsistentState {
					variant,
					message: "retrieval ran without a classification.".to_string(),
				});
			}
			if retrieved.map(Vec::is_empty).unwrap_or(true) && !summary.is_empty() {
				return Err(Error::InconsistentState {
					variant,
					message: "summary exists without retrieved documents.".to_string(),
				});
			}
		}

		Ok(())
	}
}
