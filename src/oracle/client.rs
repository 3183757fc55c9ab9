/// Gemini HTTP client implementation.
///
/// This module provides `GeminiClient` for making synchronous HTTP requests to the
/// Generative Language API, along with the oracle trait and its error type.
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Credential;

/// Default endpoint of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Errors that can occur when calling the generative oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Errors reported by the API in its response body
    #[error("Oracle API error: {message}")]
    Api { message: String },

    /// No API key was supplied
    #[error("API key is missing")]
    MissingCredential,

    /// The credential probe was rejected
    #[error("API key rejected: {message}")]
    InvalidCredential { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OracleError {
    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// Capability interface of the generative model.
///
/// Implementations must be usable from several pipeline invocations at once;
/// every call carries its own credential.
pub trait GenerativeOracle: Send + Sync {
    /// Sends a rendered prompt to `model` and returns the generated text.
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, OracleError>;

    /// Checks that `credential` is accepted, without generating anything.
    fn verify_credential(&self, credential: &Credential) -> Result<(), OracleError>;
}

/// Builder for constructing `GeminiClient` instances.
///
/// # Examples
///
/// ```
/// use peoplesay::oracle::GeminiClientBuilder;
///
/// let client = GeminiClientBuilder::new()
///     .base_url("https://generativelanguage.googleapis.com")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct GeminiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiClientBuilder {
    /// Creates a new `GeminiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the API (scheme and host, no path).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Overrides the request timeout for generation calls (default 120s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `GeminiClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, this method will check the `GEMINI_BASE_URL`
    /// environment variable. If not set, it defaults to [`DEFAULT_BASE_URL`].
    pub fn build(self) -> Result<GeminiClient, OracleError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => {
                std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            }
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        reqwest::Url::parse(&base_url)
            .map_err(|e| OracleError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OracleError::Network)?;

        Ok(GeminiClient { client, base_url })
    }
}

/// Synchronous HTTP client for the Generative Language API.
///
/// It should be constructed using `GeminiClientBuilder`. Calls are not retried.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GeminiClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the model ids visible to `credential`.
    ///
    /// This is the same request `verify_credential` uses as its probe.
    pub fn list_models(&self, credential: &Credential) -> Result<Vec<String>, OracleError> {
        let json = self.models_request(credential, Duration::from_secs(5))?;
        Ok(model_names(&json))
    }

    fn models_request(
        &self,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<serde_json::Value, OracleError> {
        if credential.is_blank() {
            return Err(OracleError::MissingCredential);
        }

        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", credential.expose())
            .timeout(timeout)
            .send()
            .map_err(OracleError::from_transport)?;

        let status = response.status();
        let body: serde_json::Value = response.json().unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            let message = api_error_message(&body).unwrap_or_else(|| "Unknown error".to_string());
            warn!(status = status.as_u16(), %message, "API key verification failed");
            return Err(OracleError::InvalidCredential { message });
        }

        Ok(body)
    }

    fn generate_url(&self, model: &str) -> String {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/v1beta/{}:generateContent", self.base_url, model)
    }

    fn generate_internal(
        &self,
        model: &str,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, OracleError> {
        if credential.is_blank() {
            return Err(OracleError::MissingCredential);
        }

        let url = self.generate_url(model);
        let request_body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        debug!(model, prompt_len = prompt.len(), "sending generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.expose())
            .json(&request_body)
            .send()
            .map_err(OracleError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().unwrap_or(serde_json::Value::Null);
            return Err(match api_error_message(&body) {
                Some(message) => OracleError::Api { message },
                None => OracleError::Http {
                    status: status.as_u16(),
                },
            });
        }

        let text = response.text().map_err(OracleError::from_transport)?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(OracleError::Serialization)?;

        extract_candidate_text(&json)
    }
}

impl GenerativeOracle for GeminiClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, OracleError> {
        self.generate_internal(model, prompt, credential)
    }

    fn verify_credential(&self, credential: &Credential) -> Result<(), OracleError> {
        self.models_request(credential, Duration::from_secs(5))
            .map(|_| ())
    }
}

/// Extracts the generated text from a `generateContent` response.
///
/// Joins the text parts of the first candidate. A candidate without text yields an
/// empty string; a response with no candidates is an API error.
fn extract_candidate_text(json: &serde_json::Value) -> Result<String, OracleError> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());

    let Some(candidate) = candidate else {
        let reason = json
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(|r| r.as_str())
            .map(|r| format!("prompt blocked: {}", r))
            .unwrap_or_else(|| "Missing 'candidates' field in API response".to_string());
        return Err(OracleError::Api { message: reason });
    };

    let text = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

/// Reads `error.message` from an API error body.
fn api_error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

/// Reads model names from a `models` listing.
fn model_names(body: &serde_json::Value) -> Vec<String> {
    body.get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|model| model.get("name").and_then(|n| n.as_str()))
                .map(|name| name.to_string())
                .collect()
        })
        .unwrap_or_default()
}
