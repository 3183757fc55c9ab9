use serde::{Deserialize, Serialize};
use std::fmt;

/// A multi-valued categorical attribute stored in its own link table.
///
/// Each variant maps to one `{attribute}_table(entry_id, {attribute})` table and
/// to one `... [web]` column of the source spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAttribute {
    Subtopics,
    Topics,
    CommonTopics,
    DataType,
    Insurance,
    RaceEthnicity,
}

impl LinkAttribute {
    /// All link attributes in table-creation order.
    pub const ALL: [LinkAttribute; 6] = [
        Self::Subtopics,
        Self::Topics,
        Self::CommonTopics,
        Self::DataType,
        Self::Insurance,
        Self::RaceEthnicity,
    ];

    /// Column holding the attribute value inside the link table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Subtopics => "subtopics",
            Self::Topics => "topics",
            Self::CommonTopics => "common_topics",
            Self::DataType => "data_type",
            Self::Insurance => "insurance",
            Self::RaceEthnicity => "race_ethnicity",
        }
    }

    /// Name of the link table.
    pub fn table(self) -> &'static str {
        match self {
            Self::Subtopics => "subtopics_table",
            Self::Topics => "topics_table",
            Self::CommonTopics => "common_topics_table",
            Self::DataType => "data_type_table",
            Self::Insurance => "insurance_table",
            Self::RaceEthnicity => "race_ethnicity_table",
        }
    }

    /// Header of the source spreadsheet column carrying this attribute.
    pub fn source_header(self) -> &'static str {
        match self {
            Self::Subtopics => "Subtopics [web]",
            Self::Topics => "Topics [web]",
            Self::CommonTopics => "Common Topics [web]",
            Self::DataType => "Data Type [web]",
            Self::Insurance => "Insurance [web]",
            Self::RaceEthnicity => "Race/Ethnicity [web]",
        }
    }
}

impl fmt::Display for LinkAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}
