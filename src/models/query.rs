use std::fmt;

use serde::{Deserialize, Serialize};

/// A generated read-only statement over the normalized store.
///
/// Construction does not validate; `is_select` is the syntactic gate applied by
/// both the synthesizer and the executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredQuery(String);

impl StructuredQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the text is non-blank and contains `SELECT` in any case.
    pub fn is_select(&self) -> bool {
        contains_select(&self.0)
    }

    /// The query truncated to at most `max` characters, for logging.
    pub fn preview(&self, max: usize) -> String {
        match self.0.char_indices().nth(max) {
            Some((cut, _)) => format!("{}...", &self.0[..cut]),
            None => self.0.clone(),
        }
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StructuredQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StructuredQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Case-insensitive check for a `SELECT` token.
pub(crate) fn contains_select(text: &str) -> bool {
    !text.trim().is_empty() && text.to_uppercase().contains("SELECT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_gate_is_case_insensitive() {
        assert!(StructuredQuery::new("select * from peoplesay").is_select());
        assert!(StructuredQuery::new("WITH x AS (SeLeCt 1) SELECT * FROM x").is_select());
        assert!(!StructuredQuery::new("I cannot answer that.").is_select());
        assert!(!StructuredQuery::new("   ").is_select());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let query = StructuredQuery::new("SELECT 'éé'");
        assert_eq!(query.preview(8), "SELECT '...");
        assert_eq!(query.preview(100), "SELECT 'éé'");
    }

    #[test]
    fn serializes_as_plain_string() {
        let query = StructuredQuery::new("SELECT 1");
        assert_eq!(serde_json::to_string(&query).unwrap(), r#""SELECT 1""#);
    }
}
