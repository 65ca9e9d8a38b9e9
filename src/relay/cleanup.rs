//! Cleanup of generated text before it goes out over WhatsApp.
//!
//! Assistant replies carry citation markers such as `[4:0†source]` or
//! `(3:1†file.pdf)` that mean nothing to the user. They are stripped, then
//! all whitespace runs are collapsed to single spaces and the ends trimmed.

use std::sync::LazyLock;

use regex::Regex;

static BRACKET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+:\d+[^\]]*\]").unwrap());

static PAREN_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+:\d+[^)]*\)").unwrap());

/// Full-width variant the Assistants API emits (`【4:0†source】`).
static LENTICULAR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【\d+:\d+[^】]*】").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip citation markers and normalize whitespace. Idempotent.
pub fn clean_response(text: &str) -> String {
    let mut current = text.to_string();

    // Removing one marker can expose another around it, so run to a fixpoint.
    loop {
        let stripped = [&*BRACKET_MARKER, &*PAREN_MARKER, &*LENTICULAR_MARKER]
            .iter()
            .fold(current.clone(), |acc, re| re.replace_all(&acc, "").into_owned());
        if stripped == current {
            break;
        }
        current = stripped;
    }

    WHITESPACE.replace_all(&current, " ").trim().to_string()
}
