//! Health checks for the `status` command.
//!
//! Reports whether the store exists and what it holds, and whether the
//! configured API key is accepted by the oracle.

use std::path::Path;

use anyhow::{Result, bail};
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::config::{Settings, model_description};
use crate::models::{Credential, LinkAttribute};
use crate::oracle::{GeminiClientBuilder, GenerativeOracle, OracleError};

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const MISSING_KEY: &str = "GOOGLE_API_KEY is not set";

/// Health status for a component.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

/// Store health and contents.
#[derive(Debug)]
pub struct StoreHealth {
    pub status: HealthStatus,
    pub file_path: String,
    pub entries: i64,
    pub link_rows: Vec<(LinkAttribute, i64)>,
    pub ingested_at: Option<String>,
    pub source: Option<String>,
}

impl StoreHealth {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            status: HealthStatus::Error(message),
            file_path: path.display().to_string(),
            entries: 0,
            link_rows: Vec::new(),
            ingested_at: None,
            source: None,
        }
    }
}

/// Oracle connectivity and credential health.
#[derive(Debug)]
pub struct OracleHealth {
    pub status: HealthStatus,
    pub base_url: String,
    pub model: String,
}

/// Performs all health checks and prints results.
///
/// # Errors
///
/// Returns the verdict of [`health_verdict`] when a component is not usable.
pub fn run_health_checks(settings: &Settings) -> Result<()> {
    let store = check_store(&settings.db_path);

    let mut builder = GeminiClientBuilder::new();
    if let Some(url) = &settings.base_url {
        builder = builder.base_url(url.clone());
    }
    let oracle = match builder.build() {
        Ok(client) => {
            let base_url = client.base_url().to_string();
            OracleHealth {
                status: check_oracle(&client, &settings.credential()),
                base_url,
                model: settings.model.clone(),
            }
        }
        Err(e) => OracleHealth {
            status: HealthStatus::Error(format!("Failed to build client: {}", e)),
            base_url: String::new(),
            model: settings.model.clone(),
        },
    };

    print_health_report(&store, &oracle);
    health_verdict(&store, &oracle)
}

/// Turns a health report into the command outcome.
///
/// A missing API key is reported on its own so the CLI treats it as a user
/// error; any other failed component is reported together with the rest.
/// Warnings do not fail the check.
pub fn health_verdict(store: &StoreHealth, oracle: &OracleHealth) -> Result<()> {
    if let HealthStatus::Error(message) = &oracle.status
        && message == MISSING_KEY
    {
        bail!("{}", MISSING_KEY);
    }

    let failures: Vec<String> = [("store", &store.status), ("oracle", &oracle.status)]
        .into_iter()
        .filter_map(|(component, status)| match status {
            HealthStatus::Error(message) => Some(format!("{}: {}", component, message)),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        bail!("Health check failed ({})", failures.join("; "));
    }
    Ok(())
}

/// Inspects the store at `path` without creating or modifying it.
pub fn check_store(path: &Path) -> StoreHealth {
    if !path.is_file() {
        return StoreHealth::failed(path, "Store not found; run `peoplesay ingest`".to_string());
    }

    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(e) => return StoreHealth::failed(path, format!("Connection failed: {}", e)),
    };

    match read_store_stats(&conn) {
        Ok((entries, link_rows, ingested_at, source)) => StoreHealth {
            status: if entries == 0 {
                HealthStatus::Warning("Store is empty".to_string())
            } else {
                HealthStatus::Ok
            },
            file_path: path.display().to_string(),
            entries,
            link_rows,
            ingested_at,
            source,
        },
        Err(e) => StoreHealth::failed(path, format!("Store is not readable: {}", e)),
    }
}

type StoreStats = (i64, Vec<(LinkAttribute, i64)>, Option<String>, Option<String>);

fn read_store_stats(conn: &Connection) -> rusqlite::Result<StoreStats> {
    let entries: i64 = conn.query_row("SELECT COUNT(*) FROM peoplesay", [], |row| row.get(0))?;

    let mut link_rows = Vec::with_capacity(LinkAttribute::ALL.len());
    for attribute in LinkAttribute::ALL {
        let sql = format!("SELECT COUNT(*) FROM {}", attribute.table());
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        link_rows.push((attribute, count));
    }

    let metadata = |key: &str| -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM store_metadata WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
    };

    Ok((entries, link_rows, metadata("ingested_at")?, metadata("source")?))
}

/// Checks that `credential` is present and accepted by `oracle`.
pub fn check_oracle(oracle: &dyn GenerativeOracle, credential: &Credential) -> HealthStatus {
    if credential.is_blank() {
        return HealthStatus::Error(MISSING_KEY.to_string());
    }
    match oracle.verify_credential(credential) {
        Ok(()) => HealthStatus::Ok,
        Err(OracleError::InvalidCredential { message }) => {
            HealthStatus::Error(format!("API key rejected: {}", message))
        }
        Err(e) => HealthStatus::Error(format!("Connection failed: {}", e)),
    }
}

// ============================================================================
// Pretty Printing
// ============================================================================

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "\u{2713}",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "\u{2717}",
    }
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

fn status_text<'a>(status: &'a HealthStatus, ok: &'a str) -> &'a str {
    match status {
        HealthStatus::Ok => ok,
        HealthStatus::Warning(message) | HealthStatus::Error(message) => message,
    }
}

fn print_health_report(store: &StoreHealth, oracle: &OracleHealth) {
    println!("{}peoplesay status{}", BOLD, RESET);
    println!();

    println!("{}Store{}", BOLD, RESET);
    println!(
        "  {}{}{} Status: {}",
        status_color(&store.status),
        status_symbol(&store.status),
        RESET,
        status_text(&store.status, "OK")
    );
    println!("    {}Path: {}{}", DIM, store.file_path, RESET);
    if let Some(ingested_at) = &store.ingested_at {
        println!("    {}Ingested: {}{}", DIM, ingested_at, RESET);
    }
    if let Some(source) = &store.source {
        println!("    {}Source: {}{}", DIM, source, RESET);
    }
    println!();

    if !matches!(store.status, HealthStatus::Error(_)) {
        println!("{}Contents{}", BOLD, RESET);
        println!("  {:<16} {:>6}", "Entries:", store.entries);
        for (attribute, count) in &store.link_rows {
            println!("  {:<16} {:>6}", format!("{}:", attribute.table()), count);
        }
        println!();
    }

    println!("{}Oracle{}", BOLD, RESET);
    println!(
        "  {}{}{} API key: {}",
        status_color(&oracle.status),
        status_symbol(&oracle.status),
        RESET,
        status_text(&oracle.status, "Accepted")
    );
    if !oracle.base_url.is_empty() {
        println!("    {}URL: {}{}", DIM, oracle.base_url, RESET);
    }
    match model_description(&oracle.model) {
        Some(description) => println!("    {}Model: {} ({}){}", DIM, oracle.model, description, RESET),
        None => println!("    {}Model: {}{}", DIM, oracle.model, RESET),
    }
}

// ============================================================================
// Tests
// ============================================================================
