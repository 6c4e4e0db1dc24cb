//! # Parsing Utils
//!
//! Extracts structured values from free-text user input.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}").expect("email pattern compiles")
});

/// Returns the first email address found anywhere in `text`.
pub fn extract_email(text: &str) -> Option<&str> {
    EMAIL_REGEX.find(text).map(|m| m.as_str())
}
