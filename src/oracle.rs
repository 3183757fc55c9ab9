/// Generative oracle access.
///
/// The synthesizer and summarizer only see the `GenerativeOracle` trait. `GeminiClient`
/// is the production adapter over the Google Generative Language HTTP API;
/// `StubOracle` is a deterministic stand-in for tests and offline runs.
mod client;
mod stub;

pub use client::{
    DEFAULT_BASE_URL, GeminiClient, GeminiClientBuilder, GenerativeOracle, OracleError,
};
pub use stub::StubOracle;
