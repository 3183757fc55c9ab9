//! Deterministic oracle for tests and offline runs.

use std::sync::Mutex;

use crate::models::Credential;

use super::{GenerativeOracle, OracleError};

/// A canned reply: generated text, or an API error carrying the message.
type Reply = Result<String, String>;

/// Oracle that answers from a fixed rule table.
///
/// The first rule whose needle occurs in the prompt decides the reply; when none
/// matches, the default reply is used. Given the same prompts it always answers
/// the same way.
///
/// # Examples
///
/// ```
/// use peoplesay::oracle::{GenerativeOracle, StubOracle};
/// use peoplesay::Credential;
///
/// let oracle = StubOracle::new()
///     .reply_when("SQL", "SELECT 1")
///     .default_reply("Summary [Title]");
///
/// let key = Credential::new("test-key");
/// assert_eq!(oracle.generate("m", "write SQL", &key).unwrap(), "SELECT 1");
/// assert_eq!(oracle.generate("m", "summarize", &key).unwrap(), "Summary [Title]");
/// ```
#[derive(Debug)]
pub struct StubOracle {
    rules: Vec<(String, Reply)>,
    default: Reply,
    reject_credentials: bool,
    prompts: Mutex<Vec<String>>,
}

impl Default for StubOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl StubOracle {
    /// Creates a stub that answers every prompt with an empty string.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: Ok(String::new()),
            reject_credentials: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers prompts containing `needle` with `text`.
    pub fn reply_when(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Ok(text.into())));
        self
    }

    /// Fails prompts containing `needle` with an API error.
    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Err(message.into())));
        self
    }

    /// Sets the reply used when no rule matches.
    pub fn default_reply(mut self, text: impl Into<String>) -> Self {
        self.default = Ok(text.into());
        self
    }

    /// Makes `verify_credential` reject every key.
    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// Number of `generate` calls received so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl GenerativeOracle for StubOracle {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, OracleError> {
        if credential.is_blank() {
            return Err(OracleError::MissingCredential);
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default);

        reply
            .clone()
            .map_err(|message| OracleError::Api { message })
    }

    fn verify_credential(&self, credential: &Credential) -> Result<(), OracleError> {
        if credential.is_blank() {
            return Err(OracleError::MissingCredential);
        }
        if self.reject_credentials {
            return Err(OracleError::InvalidCredential {
                message: "API key not valid".to_string(),
            });
        }
        Ok(())
    }
}
