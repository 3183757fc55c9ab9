//! Summary generation over a retrieved result set.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::models::{Credential, ResultRow, ResultSet};
use crate::oracle::GenerativeOracle;
use crate::prompt;

use super::mode::AnalysisMode;

/// Returned when the result set holds no rows.
pub const NO_RELEVANT_DATA: &str = "No relevant data found to summarize.";

/// Returned when the oracle answers with empty text.
pub const SUMMARY_EMPTY: &str = "The AI failed to generate a summary based on the data.";

/// Returned when the credential is missing or rejected.
pub const SUMMARY_UNAVAILABLE: &str =
    "Error: Could not generate the summary from the retrieved data.";

/// Placeholder for metadata a row does not carry.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Columns every row must carry to be formatted as a citable source.
const REQUIRED_COLUMNS: [&str; 3] = ["data_unit", "data_unit_title", "participant_name"];

const BLOCK_DELIMITER: &str = "\n---\n";

/// What the summarizer produced for one result set.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// The oracle produced a summary grounded in `grounding`.
    Generated {
        text: String,
        grounding: Vec<ResultRow>,
    },
    /// The result set was empty.
    NoData,
    /// The oracle answered with empty text; the rows are still returned.
    EmptyResponse { grounding: Vec<ResultRow> },
    /// No summary and no grounding.
    Failed { message: String },
}

impl SummaryOutcome {
    /// The text shown to the user.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated { text, .. } => text,
            Self::NoData => NO_RELEVANT_DATA,
            Self::EmptyResponse { .. } => SUMMARY_EMPTY,
            Self::Failed { message } => message,
        }
    }

    /// The grounding set, or `None` when the summarizer failed.
    pub fn grounding(&self) -> Option<&[ResultRow]> {
        match self {
            Self::Generated { grounding, .. } | Self::EmptyResponse { grounding } => {
                Some(grounding)
            }
            Self::NoData => Some(&[]),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Splits the outcome into its text and grounding set.
    pub fn into_parts(self) -> (String, Option<Vec<ResultRow>>) {
        match self {
            Self::Generated { text, grounding } => (text, Some(grounding)),
            Self::NoData => (NO_RELEVANT_DATA.to_string(), Some(Vec::new())),
            Self::EmptyResponse { grounding } => (SUMMARY_EMPTY.to_string(), Some(grounding)),
            Self::Failed { message } => (message, None),
        }
    }
}

/// Summarizes retrieved rows with one oracle call.
pub struct GroundedSummarizer {
    oracle: Arc<dyn GenerativeOracle>,
}

impl GroundedSummarizer {
    pub fn new(oracle: Arc<dyn GenerativeOracle>) -> Self {
        Self { oracle }
    }

    /// Summarizes `rows` as an answer to `question`.
    ///
    /// Never returns an error: every failure is reported as an outcome.
    pub fn summarize(
        &self,
        model: &str,
        question: &str,
        rows: &ResultSet,
        mode: AnalysisMode,
        credential: &Credential,
    ) -> SummaryOutcome {
        if rows.is_empty() {
            info!("no rows to summarize");
            return SummaryOutcome::NoData;
        }

        let missing = missing_columns(rows);
        if !missing.is_empty() {
            error!(?missing, "result set lacks required columns");
            return SummaryOutcome::Failed {
                message: format!(
                    "Internal Error: Data processing failed (missing columns: {}).",
                    missing.join(", ")
                ),
            };
        }

        let uncitable = uncitable_rows(rows.rows());
        if !uncitable.is_empty() {
            warn!(
                rows = ?uncitable,
                "rows without a title or excerpt cannot be cited by title"
            );
        }

        if credential.is_blank() {
            error!("cannot summarize without an API key");
            return SummaryOutcome::Failed {
                message: SUMMARY_UNAVAILABLE.to_string(),
            };
        }
        if let Err(e) = self.oracle.verify_credential(credential) {
            error!(error = %e, "API key check failed before summarization");
            return SummaryOutcome::Failed {
                message: SUMMARY_UNAVAILABLE.to_string(),
            };
        }

        let context = format_context(rows.rows());
        let grounding = rows.rows().to_vec();
        let prompt = prompt::render(mode.template(), &[
            ("user_query", question),
            ("retrieved_data", context.as_str()),
        ]);
        debug!(model, %mode, rows = grounding.len(), "requesting summary");

        match self.oracle.generate(model, &prompt, credential) {
            Ok(text) if text.trim().is_empty() => {
                warn!("oracle response for summary was empty");
                SummaryOutcome::EmptyResponse { grounding }
            }
            Ok(text) => {
                info!(%mode, sources = grounding.len(), "generated summary");
                SummaryOutcome::Generated {
                    text: text.trim().to_string(),
                    grounding,
                }
            }
            Err(e) => {
                error!(error = %e, "summary generation failed");
                SummaryOutcome::Failed {
                    message: format!("An error occurred while generating the summary: {}", e),
                }
            }
        }
    }
}

fn missing_columns(rows: &ResultSet) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !rows.has_column(column))
        .collect()
}

/// Positions of rows whose title or excerpt is blank.
///
/// Such rows are still summarized, but their `Source ID` is the placeholder
/// and matches no real title.
fn uncitable_rows(rows: &[ResultRow]) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.text("data_unit_title").is_none() || row.text("data_unit").is_none())
        .map(|(index, _)| index)
        .collect()
}

/// Formats rows into the context document, one block per row.
fn format_context(rows: &[ResultRow]) -> String {
    rows.iter()
        .map(format_block)
        .collect::<Vec<_>>()
        .join(BLOCK_DELIMITER)
}

fn format_block(row: &ResultRow) -> String {
    let field = |column: &str| first_text(row, &[column]);

    let location = match (row.text("location_type"), row.text("state")) {
        (Some(kind), Some(state)) => format!("{}, {}", kind, state),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => NOT_SPECIFIED.to_string(),
    };

    format!(
        "Source ID: [{}]\n\
         Participant: {}\n\
         Metadata:\n\
         \x20 Participant Type: {}\n\
         \x20 Age: {}\n\
         \x20 Gender: {}\n\
         \x20 Race/Ethnicity: {}\n\
         \x20 Language: {}\n\
         \x20 Location: {}\n\
         \x20 Income (FPL): {}\n\
         \x20 Insurance: {}\n\
         Excerpt: {}\n",
        field("data_unit_title"),
        field("participant_name"),
        field("participant_type"),
        field("age"),
        field("gender"),
        first_text(row, &["participant_race_ethnicity", "race_ethnicity"]),
        field("language"),
        location,
        field("income_range_fpl"),
        first_text(row, &["participant_insurance", "insurance"]),
        field("data_unit"),
    )
}

/// The first of `columns` holding a value, or the placeholder.
fn first_text(row: &ResultRow, columns: &[&str]) -> String {
    columns
        .iter()
        .find_map(|column| row.text(column))
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}
