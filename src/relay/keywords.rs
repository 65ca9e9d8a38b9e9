//! Keyword classifier for informational queries.
//!
//! Runs before the LLM to short-circuit questions about opening hours,
//! prices and tickets. If any keyword matches, the generator is skipped and
//! the canned reply is sent instead.

use tracing::debug;

/// Keywords matched by default. Lowercase; the relay's audience writes Spanish.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "horario", "horarios", "abre", "abren", "cierra", "cierran", "precio", "precios", "cuesta",
    "cuánto", "cuanto", "tarifa", "tarifas", "entrada", "entradas", "boleto", "boletos", "ticket",
    "tickets",
];

/// Immutable set of lowercase substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Build a set from arbitrary keywords. Entries are trimmed and
    /// lowercased; blanks are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// The built-in keyword list.
    pub fn default_set() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }

    /// An empty set that never matches (for testing).
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword contained in `text`, case-insensitively.
    pub fn find_match(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        let hit = self
            .keywords
            .iter()
            .find(|k| text.contains(k.as_str()))
            .map(String::as_str);
        if let Some(keyword) = hit {
            debug!(keyword, "Keyword matched");
        }
        hit
    }

    /// Whether any keyword occurs in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::default_set()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn price_question_matches() {
        let set = KeywordSet::default_set();
        assert!(set.is_match("¿Cuánto cuesta la entrada?"));
    }

    #[test]
    fn general_greeting_does_not_match() {
        let set = KeywordSet::default_set();
        assert!(!set.is_match("Hola, quiero info general"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let set = KeywordSet::default_set();
        assert!(set.is_match("¿A QUÉ HORA ABRE el museo?"));
        assert!(set.is_match("PRECIOS por favor"));
    }

    #[test]
    fn accented_uppercase_is_folded() {
        let set = KeywordSet::new(["cuánto"]);
        assert!(set.is_match("CUÁNTO"));
    }

    #[test]
    fn substring_inside_word_matches() {
        let set = KeywordSet::new(["precio"]);
        assert_eq!(set.find_match("Preciosísimo"), Some("precio"));
    }

    #[test]
    fn keywords_are_normalized_on_construction() {
        let set = KeywordSet::new([" Horario ", "", "TICKET"]);
        assert_eq!(set.keywords(), &["horario".to_string(), "ticket".into()]);
        assert!(set.is_match("mi ticket"));
    }

    #[test]
    fn empty_set_never_matches() {
        let set = KeywordSet::empty();
        assert!(!set.is_match("precio horario entrada"));
        assert!(!set.is_match(""));
    }

    #[test]
    fn empty_text_never_matches() {
        assert!(!KeywordSet::default_set().is_match(""));
    }

    // Every default keyword contains a vowel, so vowel-free text cannot match.
    const VOWEL_FREE: &str = "[bcdfghjklmnñpqrstvwxyzBCDFGHJKLMNÑPQRSTVWXYZ0-9 ¿?¡!,.]{0,80}";

    proptest! {
        #[test]
        fn text_without_keywords_never_matches(text in VOWEL_FREE) {
            prop_assert!(!KeywordSet::default_set().is_match(&text));
        }

        #[test]
        fn embedded_keyword_always_matches(
            prefix in "[a-zñ ]{0,20}",
            suffix in "[a-zñ ?!]{0,20}",
            index in 0..DEFAULT_KEYWORDS.len(),
            shout in any::<bool>(),
        ) {
            let keyword = DEFAULT_KEYWORDS[index];
            let keyword = if shout { keyword.to_uppercase() } else { keyword.to_string() };
            let text = format!("{prefix}{keyword}{suffix}");
            prop_assert!(KeywordSet::default_set().is_match(&text));
        }
    }
}
