//! Suspicious content detection.
//!
//! Validation stages ask a [`ContentInspector`] whether a string looks like
//! an attack. The default is a case-insensitive substring blocklist; a
//! stronger inspector can be swapped in without touching the chain.

use std::fmt::Debug;

/// Decides whether input carries suspicious content.
pub trait ContentInspector: Send + Sync + Debug {
    /// Returns true if `input` should be rejected.
    fn is_suspicious(&self, input: &str) -> bool;
}

/// Script injection, SQL injection and path traversal markers.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "<script", "</script>", "javascript:", "vbscript:",
    "onload", "onclick", "onerror", "onmouseover",
    "eval(", "expression(", "document.cookie",
    "union select", "select * from", "insert into",
    "delete from", "drop table", "../", "..\\",
    "\\x", "\\u", "%2e%2e%2f", "%2e%2e%5c",
];

/// Substring blocklist matched against lowercased input.
#[derive(Debug, Clone)]
pub struct BlocklistInspector {
    patterns: Vec<String>,
}

impl BlocklistInspector {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for BlocklistInspector {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS)
    }
}

impl ContentInspector for BlocklistInspector {
    fn is_suspicious(&self, input: &str) -> bool {
        let lower = input.to_lowercase();
        self.patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// True if `input` holds control characters other than tab, CR and LF.
pub fn contains_control_characters(input: &str) -> bool {
    input
        .chars()
        .any(|c| c.is_control() && c != '\t' && c != '\n' && c != '\r')
}

/// Replace content that should not reach the logs.
pub fn redact<'a>(inspector: &dyn ContentInspector, input: &'a str) -> &'a str {
    if inspector.is_suspicious(input) || contains_control_characters(input) {
        "[REDACTED]"
    } else {
        input
    }
}
