//! Question to cited summary, end to end.
//!
//! `Pipeline::run` drives one question through synthesis, execution and
//! summarization, stopping at the first stage that fails. Every stage error is
//! turned into a user-facing message here; the cause is logged by the stage
//! that hit it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::executor::{ExecutionError, QueryExecutor};
use crate::models::{Credential, ResultRow, StructuredQuery};
use crate::oracle::GenerativeOracle;
use crate::summarizer::{AnalysisMode, GroundedSummarizer, SummaryOutcome};
use crate::synthesizer::QuerySynthesizer;
use crate::vocabulary::Vocabulary;

pub const QUERY_GENERATION_FAILED: &str = "Error: Could not generate the database query.";
pub const NO_DATA_FOUND: &str = "No data found matching your query.";
pub const STORE_UNAVAILABLE: &str = "Error: The research database is unavailable.";
pub const QUERY_FAILED: &str = "Error: The generated query could not be executed.";

/// How far a pipeline run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Summarized,
    QueryGenerationFailed,
    NoData,
    StoreUnavailable,
    QueryFailed,
    SummaryFailed,
}

impl PipelineStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Summarized | Self::NoData)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Summarized => "summarized",
            Self::QueryGenerationFailed => "query_generation_failed",
            Self::NoData => "no_data",
            Self::StoreUnavailable => "store_unavailable",
            Self::QueryFailed => "query_failed",
            Self::SummaryFailed => "summary_failed",
        };
        f.write_str(s)
    }
}

/// Final answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Summary text or a user-facing error message.
    pub summary: String,
    /// The grounding set: rows the summary may cite.
    pub sources: Vec<ResultRow>,
    /// The generated query, absent when synthesis failed.
    pub query: Option<StructuredQuery>,
    pub status: PipelineStatus,
}

impl PipelineResult {
    fn stopped(
        summary: &str,
        query: Option<StructuredQuery>,
        status: PipelineStatus,
    ) -> Self {
        Self {
            summary: summary.to_string(),
            sources: Vec::new(),
            query,
            status,
        }
    }

    /// Splits the result into `(summary, sources, query)`.
    pub fn into_parts(self) -> (String, Vec<ResultRow>, Option<StructuredQuery>) {
        (self.summary, self.sources, self.query)
    }
}

/// The synthesize, execute, summarize chain for one store and model.
pub struct Pipeline {
    synthesizer: QuerySynthesizer,
    executor: QueryExecutor,
    summarizer: GroundedSummarizer,
    model: String,
}

impl Pipeline {
    pub fn new(
        synthesizer: QuerySynthesizer,
        executor: QueryExecutor,
        summarizer: GroundedSummarizer,
        model: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            executor,
            summarizer,
            model: model.into(),
        }
    }

    /// Builds a pipeline whose stages share one oracle.
    pub fn with_oracle(
        oracle: Arc<dyn GenerativeOracle>,
        vocabulary: Vocabulary,
        db_path: impl Into<PathBuf>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(
            QuerySynthesizer::new(Arc::clone(&oracle)).with_vocabulary(vocabulary),
            QueryExecutor::new(db_path),
            GroundedSummarizer::new(oracle),
            model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answers `question` in the named analysis mode.
    ///
    /// Unknown mode names fall back to Thematic Analysis.
    pub fn process(&self, question: &str, mode: &str, credential: &Credential) -> PipelineResult {
        self.run(question, AnalysisMode::resolve(mode), credential)
    }

    /// Answers `question`, making at most one synthesis and one summary call.
    pub fn run(
        &self,
        question: &str,
        mode: AnalysisMode,
        credential: &Credential,
    ) -> PipelineResult {
        info!(question, %mode, model = %self.model, "processing question");

        let query = match self.synthesizer.synthesize(&self.model, question, credential) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "query synthesis failed");
                return PipelineResult::stopped(
                    QUERY_GENERATION_FAILED,
                    None,
                    PipelineStatus::QueryGenerationFailed,
                );
            }
        };

        let rows = match self.executor.execute(&query) {
            Ok(rows) => rows,
            Err(e) => return execution_failure(e, query),
        };
        if rows.is_empty() {
            info!("query matched no rows");
            return PipelineResult::stopped(NO_DATA_FOUND, Some(query), PipelineStatus::NoData);
        }

        let outcome = self
            .summarizer
            .summarize(&self.model, question, &rows, mode, credential);
        let status = match outcome {
            SummaryOutcome::Generated { .. } => PipelineStatus::Summarized,
            SummaryOutcome::NoData => PipelineStatus::NoData,
            SummaryOutcome::EmptyResponse { .. } | SummaryOutcome::Failed { .. } => {
                PipelineStatus::SummaryFailed
            }
        };
        let (summary, sources) = outcome.into_parts();

        PipelineResult {
            summary,
            sources: sources.unwrap_or_default(),
            query: Some(query),
            status,
        }
    }
}

fn execution_failure(error: ExecutionError, query: StructuredQuery) -> PipelineResult {
    warn!(error = %error, "query execution failed");
    if error.is_store_unavailable() {
        PipelineResult::stopped(STORE_UNAVAILABLE, Some(query), PipelineStatus::StoreUnavailable)
    } else {
        PipelineResult::stopped(QUERY_FAILED, Some(query), PipelineStatus::QueryFailed)
    }
}
