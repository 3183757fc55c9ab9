use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{EntryId, LinkAttribute};

/// One interview or testimony excerpt, as written by ingestion.
///
/// Scalar columns map 1:1 onto the `peoplesay` table. Multi-valued attributes live
/// in `links` and are written to the link tables, one row per value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Excerpt text.
    pub data_unit: Option<String>,
    pub language: Option<String>,
    /// Title used as the citation token.
    pub data_unit_title: Option<String>,
    pub participant_type: Option<String>,
    pub participant_name: Option<String>,
    /// Age bracket, e.g. "65-70".
    pub age: Option<String>,
    pub income_range_fpl: Option<String>,
    pub location_type: Option<String>,
    pub participant_short_code: Option<String>,
    pub state: Option<String>,
    pub gender: Option<String>,
    pub profile_picture_url: Option<String>,
    pub year_conducted_research: Option<i64>,
    pub full_transcript: Option<String>,
    pub links: BTreeMap<LinkAttribute, Vec<String>>,
}

impl Entry {
    /// Creates an entry with no attributes set.
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            data_unit: None,
            language: None,
            data_unit_title: None,
            participant_type: None,
            participant_name: None,
            age: None,
            income_range_fpl: None,
            location_type: None,
            participant_short_code: None,
            state: None,
            gender: None,
            profile_picture_url: None,
            year_conducted_research: None,
            full_transcript: None,
            links: BTreeMap::new(),
        }
    }

    /// Returns the values recorded for a link attribute (empty if none).
    pub fn values(&self, attribute: LinkAttribute) -> &[String] {
        self.links
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of link-table rows this entry produces.
    pub fn link_row_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }
}
