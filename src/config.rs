//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first if present; real
//! environment variables take precedence over it. CLI flags override both.

use std::path::PathBuf;

use anyhow::Result;

use crate::models::Credential;
use crate::utils::default_database_path;

/// Model used when `PEOPLESAY_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash";

/// Known model ids with a short description.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    (
        "models/gemini-2.5-flash-preview-04-17",
        "Most intelligent (Gemini 2.5 Flash)",
    ),
    ("models/gemini-2.0-flash", "Balanced (Gemini 2.0 Flash)"),
    ("models/gemini-1.5-flash", "Fastest (Gemini 1.5 Flash)"),
];

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DB_VAR: &str = "PEOPLESAY_DB";
pub const MODEL_VAR: &str = "PEOPLESAY_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const VOCABULARY_VAR: &str = "PEOPLESAY_VOCABULARY";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub model: String,
    pub api_key: Option<Credential>,
    /// Oracle endpoint; `None` uses the client default.
    pub base_url: Option<String>,
    /// JSON file replacing the built-in vocabulary.
    pub vocabulary_path: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env` (if any) and reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if no store path is configured and the platform data
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = match get(DB_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        Ok(Self {
            db_path,
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: get(API_KEY_VAR).map(Credential::new),
            base_url: get(BASE_URL_VAR),
            vocabulary_path: get(VOCABULARY_VAR).map(PathBuf::from),
        })
    }

    /// The configured credential, or a blank one when no key is set.
    pub fn credential(&self) -> Credential {
        self.api_key.clone().unwrap_or_else(|| Credential::new(""))
    }
}

/// Description of a known model id, if it is one.
pub fn model_description(model: &str) -> Option<&'static str> {
    AVAILABLE_MODELS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, description)| *description)
}
