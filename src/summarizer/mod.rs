//! Grounded summaries of retrieved excerpts.
//!
//! The summarizer formats every retrieved row into a citable context block,
//! picks the template for the requested analysis mode and asks the oracle for a
//! summary that cites sources by their bracketed titles. The rows it formatted
//! are handed back as the grounding set.

mod grounded;
mod mode;

pub use grounded::{
    GroundedSummarizer, NO_RELEVANT_DATA, NOT_SPECIFIED, SUMMARY_EMPTY, SUMMARY_UNAVAILABLE,
    SummaryOutcome,
};
pub use mode::AnalysisMode;
