use whatlang::Lang;

/// A language the pipeline can detect, translate from, and answer in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Language {
	/// ISO 639-1 code.
	pub code: &'static str,
	/// Human-readable name used in the answer-language instruction.
	pub name: &'static str,
}

/// Raw detector output for a piece of text.
#[derive(Clone, Copy, Debug)]
pub struct Detection {
	/// ISO 639-3 code reported by the detector.
	pub detector_code: &'static str,
	pub confidence: f64,
	/// `None` when the detected language is absent from the supported table.
	pub language: Option<Language>,
}

const SUPPORTED: &[(Lang, &str, &str)] = &[
	(Lang::Eng, "en", "English"),
	(Lang::Spa, "es", "Spanish"),
	(Lang::Fra, "fr", "French"),
	(Lang::Deu, "de", "German"),
	(Lang::Ita, "it", "Italian"),
	(Lang::Por, "pt", "Portuguese"),
	(Lang::Nld, "nl", "Dutch"),
	(Lang::Rus, "ru", "Russian"),
	(Lang::Jpn, "ja", "Japanese"),
	(Lang::Cmn, "zh", "Chinese"),
	(Lang::Kor, "ko", "Korean"),
	(Lang::Ara, "ar", "Arabic"),
	(Lang::Hin, "hi", "Hindi"),
	(Lang::Ben, "bn", "Bengali"),
	(Lang::Tur, "tr", "Turkish"),
	(Lang::Vie, "vi", "Vietnamese"),
	(Lang::Pol, "pl", "Polish"),
	(Lang::Ukr, "uk", "Ukrainian"),
	(Lang::Ell, "el", "Greek"),
	(Lang::Ron, "ro", "Romanian"),
	(Lang::Swe, "sv", "Swedish"),
	(Lang::Fin, "fi", "Finnish"),
	(Lang::Nob, "no", "Norwegian"),
	(Lang::Dan, "da", "Danish"),
	(Lang::Hun, "hu", "Hungarian"),
	(Lang::Ces, "cs", "Czech"),
	(Lang::Slk, "sk", "Slovak"),
	(Lang::Cat, "ca", "Catalan"),
	(Lang::Ind, "id", "Indonesian"),
	(Lang::Tha, "th", "Thai"),
	(Lang::Pes, "fa", "Persian"),
	(Lang::Heb, "he", "Hebrew"),
];

pub const ENGLISH: Language = Language { code: "en", name: "English" };

pub fn by_code(code: &str) -> Option<Language> {
	SUPPORTED
		.iter()
		.find(|(_, iso, _)| iso.eq_ignore_ascii_case(code))
		.map(|&(_, code, name)| Language { code, name })
}

pub fn from_detector(lang: Lang) -> Option<Language> {
	SUPPORTED
		.iter()
		.find(|(candidate, _, _)| *candidate == lang)
		.map(|&(_, code, name)| Language { code, name })
}

pub fn detect(text: &str) -> Option<Detection> {
	let info = whatlang::detect(text)?;

	Some(Detection {
		detector_code: info.lang().code(),
		confidence: info.confidence(),
		language: from_detector(info.lang()),
	})
}
