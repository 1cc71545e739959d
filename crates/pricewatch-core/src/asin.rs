use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static ASIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]{10}$").expect("valid ASIN regex")
});

/// URL shapes an ASIN is pulled from, tried in order.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)/gp/product/([A-Z0-9]{10})",
        r"(?i)(?:dp|product)/([A-Z0-9]{10})",
        r"(?i)[?&]asin=([A-Z0-9]{10})",
        r"(?i)/([A-Z0-9]{10})(?:/|$|\?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid ASIN URL regex"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsinError {
    #[error("empty ASIN input")]
    Empty,
    #[error("\"{0}\" is not a valid ASIN or Amazon product URL")]
    Invalid(String),
}

/// Whether `s` is exactly ten uppercase alphanumerics.
#[must_use]
pub fn is_valid_asin(s: &str) -> bool {
    ASIN_RE.is_match(s)
}

/// Normalize user input to an ASIN: accepts a bare ASIN (any case) or an
/// Amazon product URL containing one.
///
/// # Errors
///
/// Returns [`AsinError`] when the input is blank or nothing ASIN-shaped can
/// be found.
pub fn extract_or_validate_asin(input: &str) -> Result<String, AsinError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AsinError::Empty);
    }

    let upper = trimmed.to_ascii_uppercase();
    if is_valid_asin(&upper) {
        return Ok(upper);
    }

    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
        .ok_or_else(|| AsinError::Invalid(trimmed.to_string()))
}
