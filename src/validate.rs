//! Pure input validation: accept/reject and normalize untrusted strings
//! before anything touches the database.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-']{1,100}$").expect("valid name pattern"));

// Deliberately a syntactic filter, not full RFC-5322 validation.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

pub const MAX_INPUT_LEN: usize = 255;

/// Extract a string field from a JSON value, trim it, and truncate to
/// `MAX_INPUT_LEN` characters. Missing or non-string input yields `None`.
pub fn sanitize_input(value: Option<&Value>) -> Option<String> {
    sanitize_with_limit(value, MAX_INPUT_LEN)
}

pub fn sanitize_with_limit(value: Option<&Value>, max_len: usize) -> Option<String> {
    let s = value?.as_str()?;
    Some(s.trim().chars().take(max_len).collect())
}

pub fn validate_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
