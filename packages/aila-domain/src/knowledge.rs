/// Closed set of legal subject areas a query can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum KnowledgeDomain {
	Phishing,
	LegalCases,
	Gdpr,
	PenalCode,
}
impl KnowledgeDomain {
	pub const ALL: [Self; 4] = [Self::Phishing, Self::LegalCases, Self::Gdpr, Self::PenalCode];

	/// Label the classifier prompt and response schema use for this domain.
	pub fn label(self) -> &'static str {
		match self {
			Self::Phishing => "Phishing Scenarios",
			Self::LegalCases => "Specific Legal Cases",
			Self::Gdpr => "GDPR",
			Self::PenalCode => "Greek Penal Code",
		}
	}

	pub fn from_label(label: &str) -> Option<Self> {
		let label = label.trim();

		Self::ALL.into_iter().find(|domain| domain.label().eq_ignore_ascii_case(label))
	}

	/// Index names serving this domain, recall variant first.
	pub fn index_names(self) -> &'static [&'static str] {
		match self {
			Self::Phishing => &["phishing"],
			Self::LegalCases => &["law_cases_recall", "law_cases_precision"],
			Self::Gdpr => &["gdpr_recall", "gdpr_precision"],
			Self::PenalCode => &["gpc_recall", "gpc_precision"],
		}
	}
}

/// Every index name reachable through the domain table.
pub fn index_universe() -> impl Iterator<Item = &'static str> {
	KnowledgeDomain::ALL.into_iter().flat_map(|domain| domain.index_names().iter().copied())
}

/// Resolves classifier labels to index names.
///
/// Unknown labels are ignored and duplicates keep their first position. Returns `None` when no
/// label maps to a domain, which callers treat as "no retrieval for this variant".
pub fn resolve_indexes<S>(labels: &[S]) -> Option<Vec<String>>
where
	S: AsRef<str>,
{
	let mut out: Vec<String> = Vec::new();

	for domain in labels.iter().filter_map(|label| KnowledgeDomain::from_label(label.as_ref())) {
		for name in domain.index_names() {
			if !out.iter().any(|existing| existing == name) {
				out.push((*name).to_string());
			}
		}
	}

	if out.is_empty() { None } else { Some(out) }
}
