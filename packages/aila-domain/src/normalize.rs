use unicode_normalization::UnicodeNormalization;

/// Normalizes a raw user query before language detection.
///
/// Applies NFKC, drops control characters other than newline/tab and zero-width characters,
/// collapses whitespace runs to a single space, and trims the result.
pub fn normalize_query(input: &str) -> String {
	let normalized: String = input.nfkc().collect();
	let mut out = String::with_capacity(normalized.len());
	let mut pending_space = false;

	for ch in normalized.chars() {
		if is_disallowed_control(ch) || is_zero_width(ch) {
			continue;
		}
		if ch.is_whitespace() {
			pending_space = !out.is_empty();

			continue;
		}
		if pending_space {
			out.push(' ');

			pending_space = false;
		}

		out.push(ch);
	}

	out
}

fn is_disallowed_control(ch: char) -> bool {
	ch.is_control() && !matches!(ch, '\n' | '\r' | '\t')
}

fn is_zero_width(ch: char) -> bool {
	matches!(
		ch,
		'\u{00AD}' // soft hyphen
			| '\u{034F}' // combining grapheme joiner
			| '\u{061C}' // arabic letter mark
			| '\u{180E}' // mongolian vowel separator (deprecated)
			| '\u{200B}' // zero width space
			| '\u{200C}' // zero width non-joiner
			| '\u{200D}' // zero width joiner
			| '\u{2060}' // word joiner
			| '\u{FEFF}' // zero width no-break space
	)
}

#[cfg(test)]
mod tests {
	use super::normalize_query;

	#[test]
	fn collapses_whitespace_and_trims() {
		assert_eq!(normalize_query("  What   is\n\tGDPR?  "), "What is GDPR?");
	}

	#[test]
	fn strips_zero_width_and_control_chars() {
		assert_eq!(normalize_query("phi\u{200B}shing\u{0007} attack"), "phishing attack");
	}

	#[test]
	fn nfkc_folds_fullwidth_latin() {
		assert_eq!(normalize_query("ＧＤＰＲ"), "GDPR");
	}

	#[test]
	fn keeps_non_latin_scripts() {
		assert_eq!(normalize_query(" Τι είναι ο GDPR; "), "Τι είναι ο GDPR;");
	}

	#[test]
	fn whitespace_only_input_is_empty() {
		assert!(normalize_query(" \n\t \u{200B} ").is_empty());
	}
}
