//! Tabular results returned by the query executor.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single cell value materialized from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value as display text, or `None` for NULL and blank text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(r) => Some(r.to_string()),
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One retrieved record: core entry fields plus any aggregated attribute strings.
///
/// Field order follows the column order of the query that produced it.
/// Serializes as a JSON object in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    fields: Vec<(String, FieldValue)>,
}

impl ResultRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. A repeated column name shadows the earlier one on lookup.
    pub fn push(&mut self, column: impl Into<String>, value: FieldValue) {
        self.fields.push((column.into(), value));
    }

    /// Builder-style `push`.
    pub fn with(mut self, column: impl Into<String>, value: FieldValue) -> Self {
        self.push(column, value);
        self
    }

    /// Builder-style `push` for text values.
    pub fn with_text(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(column, FieldValue::Text(value.into()))
    }

    /// Returns the value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the column rendered as text, or `None` if absent, NULL or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(FieldValue::as_text)
    }

    /// Returns the `entry_id` column as an integer, if present.
    pub fn entry_id(&self) -> Option<i64> {
        match self.get("entry_id")? {
            FieldValue::Integer(id) => Some(*id),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Rows produced by one structured query, with the query's column names.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<ResultRow>,
}

impl ResultSet {
    /// Creates a result set from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<ResultRow>) -> Self {
        Self { columns, rows }
    }

    /// Creates a result set whose columns are taken from the first row.
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.fields().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    /// Column names in query order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the query produced the given column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The retrieved rows.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Consumes the set and returns its rows.
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Entry ids that occur on more than one row, in first-seen order.
    ///
    /// A correctly aggregated query yields none.
    pub fn duplicate_entry_ids(&self) -> Vec<i64> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for id in self.rows.iter().filter_map(ResultRow::entry_id) {
            if !seen.insert(id) && !duplicates.contains(&id) {
                duplicates.push(id);
            }
        }
        duplicates
    }
}
