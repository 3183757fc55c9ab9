pub mod config;
pub mod db;
pub mod doctor;
pub mod executor;
pub mod ingest;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod prompt;
pub mod summarizer;
pub mod synthesizer;
pub mod utils;
pub mod vocabulary;

pub use config::Settings;
pub use db::Database;
pub use executor::{ExecutionError, QueryExecutor};
pub use ingest::{IngestReport, ingest_csv, ingest_reader};
pub use models::{
    Credential, Entry, EntryId, FieldValue, LinkAttribute, ResultRow, ResultSet, StructuredQuery,
};
pub use pipeline::{Pipeline, PipelineResult, PipelineStatus};
pub use summarizer::{AnalysisMode, GroundedSummarizer, SummaryOutcome};
pub use synthesizer::{QuerySynthesizer, SynthesisError};
pub use vocabulary::Vocabulary;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let query = StructuredQuery::new("select 1");
        assert!(query.is_select());

        let row = ResultRow::new().with("entry_id", FieldValue::Integer(7));
        assert_eq!(row.entry_id(), Some(7));

        assert_eq!(AnalysisMode::default().label(), "Thematic Analysis");
        assert_eq!(format!("{:?}", Credential::new("secret")), "Credential(<redacted>)");
        assert_eq!(LinkAttribute::Subtopics.table(), "subtopics_table");
    }
}
