//! SQL identifier validation.

use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// True when `s` can be used as a bare table or column name.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}
