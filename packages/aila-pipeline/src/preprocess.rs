use aila_domain::{
	language::{self, Detection, Language},
	normalize::normalize_query,
};

use crate::{Error, Pipeline, Result, prompts};

/// Statistical language identification over the raw query.
pub trait LanguageDetector
where
	Self: Send + Sync,
{
	fn detect(&self, text: &str) -> Option<Detection>;
}

/// Default detector backed by `whatlang`.
pub struct WhatlangDetector;
impl LanguageDetector for WhatlangDetector {
	fn detect(&self, text: &str) -> Option<Detection> {
		language::detect(text)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preprocessed {
	/// Text every downstream stage works on; becomes variant 0.
	pub working_query: String,
	pub language: Language,
	pub translated: bool,
}

impl Pipeline {
	/// Normalizes the query, detects its language and translates it into the working language.
	pub async fn preprocess(&self, query: &str) -> Result<Preprocessed> {
		let normalized = normalize_query(query);

		if normalized.is_empty() {
			return Err(Error::InvalidRequest { message: "Query is empty.".to_string() });
		}

		let working = self.working_language();
		let language = resolve_language(
			self.detector.detect(&normalized),
			working,
			self.cfg.pipeline.min_language_confidence,
		);

		if language == working {
			return Ok(Preprocessed { working_query: normalized, language, translated: false });
		}

		let messages = prompts::translation_messages(&normalized, working.name);
		let translation =
			self.providers.generator.generate(&self.cfg.providers.generation, &messages).await?;
		let translation = translation.trim();

		if translation.is_empty() {
			return Err(Error::InvalidOutput { message: "Translation is empty.".to_string() });
		}

		tracing::info!(from = language.code, to = working.code, "Query translated.");

		Ok(Preprocessed { working_query: translation.to_string(), language, translated: true })
	}
}

/// Maps a raw detection onto a supported language.
///
/// No detection, an unsupported language or a confidence below `min_confidence` all resolve to
/// the working language, which skips translation.
pub fn resolve_language(
	detection: Option<Detection>,
	working: Language,
	min_confidence: f64,
) -> Language {
	let Some(detection) = detection else {
		return working;
	};

	if detection.confidence < min_confidence {
		tracing::debug!(
			detector_code = detection.detector_code,
			confidence = detection.confidence,
			"Low-confidence language detection ignored."
		);

		return working;
	}

	match detection.language {
		Some(language) => language,
		None => {
			tracing::warn!(
				detector_code = detection.detector_code,
				"Detected language is not supported; treating query as the working language."
			);

			working
		},
	}
}
