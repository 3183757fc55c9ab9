use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an interview excerpt in the store.
///
/// Ids are dense (1..N) and assigned at ingestion time in source-row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    /// Creates a new entry ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_serializes_as_raw_integer() {
        let id = EntryId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let deserialized: EntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn entry_ids_order_by_value() {
        let mut ids = vec![EntryId::new(3), EntryId::new(1), EntryId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![EntryId::new(1), EntryId::new(2), EntryId::new(3)]);
    }
}
