use unicode_normalization::UnicodeNormalization;

const QUOTE_CHARS: &[char] = &['"', '\'', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];

/// Canonical form used when comparing a submitted answer against option
/// strings: trim whitespace and surrounding quotes, NFKC-normalize,
/// case-fold. Keyboard presses, copy-pasted option text and hand-typed
/// letters all land on the same representation.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| QUOTE_CHARS.contains(&c))
        .trim()
        .nfkc()
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace_and_quotes() {
        assert_eq!(normalize_answer("  \"A: Paris\"  "), "a: paris");
        assert_eq!(normalize_answer("'B'"), "b");
    }

    #[test]
    fn case_folds() {
        assert_eq!(normalize_answer("A: PARIS"), "a: paris");
    }

    #[test]
    fn applies_compatibility_normalization() {
        // Fullwidth "Ａ" folds to plain "a" under NFKC + lowercasing.
        assert_eq!(normalize_answer("\u{ff21}"), "a");
    }

    #[test]
    fn curly_quotes_are_stripped() {
        assert_eq!(normalize_answer("\u{201c}C: Rome\u{201d}"), "c: rome");
    }
}
