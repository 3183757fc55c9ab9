use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use peoplesay::config::{AVAILABLE_MODELS, Settings};
use peoplesay::oracle::GeminiClientBuilder;
use peoplesay::utils::{ensure_database_directory, preview};
use peoplesay::{AnalysisMode, Database, Pipeline, PipelineResult, Vocabulary, doctor};

/// peoplesay - ask questions of the People Say research database
#[derive(Parser)]
#[command(name = "peoplesay")]
#[command(about = "Answer questions about older adults' experiences with cited summaries")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override environment settings
#[derive(Args)]
struct Overrides {
    /// Path to the research database
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Model id used for query generation and summaries
    #[arg(long, global = true, value_name = "MODEL")]
    model: Option<String>,

    /// API key for the generative model (defaults to GOOGLE_API_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// JSON file replacing the built-in vocabulary
    #[arg(long, global = true, value_name = "PATH")]
    vocabulary: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Ask a question and get a cited summary
    Ask(AskCommand),
    /// Rebuild the database from a CSV export
    Ingest(IngestCommand),
    /// List analysis modes
    Modes,
    /// List known models
    Models,
    /// Check the database and API key
    Status,
    /// Print or validate the query vocabulary
    Vocabulary(VocabularyCommand),
}

/// Ask a question
#[derive(Parser)]
struct AskCommand {
    /// The question, in plain language
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Analysis mode (thematic, narrative, demographic, policy)
    #[arg(short, long, default_value = "thematic")]
    mode: String,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Print the generated database query
    #[arg(long)]
    show_query: bool,
}

/// Rebuild the database
#[derive(Parser)]
struct IngestCommand {
    /// CSV export with one row per excerpt
    #[arg(value_name = "CSV")]
    source: PathBuf,
}

/// Print or validate the vocabulary
#[derive(Parser)]
struct VocabularyCommand {
    /// Only validate and print a summary
    #[arg(long)]
    check: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = load_settings(&cli.overrides).and_then(|settings| match &cli.command {
        Commands::Ask(cmd) => handle_ask(cmd, &settings),
        Commands::Ingest(cmd) => handle_ingest(cmd, &settings),
        Commands::Modes => {
            handle_modes();
            Ok(())
        }
        Commands::Models => {
            handle_models(&settings);
            Ok(())
        }
        Commands::Status => doctor::run_health_checks(&settings),
        Commands::Vocabulary(cmd) => handle_vocabulary(cmd, &settings),
    });

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are missing input: an empty question or no API key.
/// Internal errors include database failures, I/O errors and failed stages.
fn is_user_error(error: &anyhow::Error) -> bool {
    let error_msg = error.to_string();
    error_msg.contains("cannot be empty") || error_msg.contains("is not set")
}

fn load_settings(overrides: &Overrides) -> Result<Settings> {
    let mut settings = Settings::from_env()?;
    apply_overrides(&mut settings, overrides);
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, overrides: &Overrides) {
    if let Some(db) = &overrides.db {
        settings.db_path = db.clone();
    }
    if let Some(model) = &overrides.model {
        settings.model = model.clone();
    }
    if let Some(key) = &overrides.api_key {
        settings.api_key = Some(peoplesay::Credential::new(key.as_str()));
    }
    if let Some(path) = &overrides.vocabulary {
        settings.vocabulary_path = Some(path.clone());
    }
}

fn load_vocabulary(settings: &Settings) -> Result<Vocabulary> {
    match &settings.vocabulary_path {
        Some(path) => Vocabulary::from_json_file(path),
        None => Ok(Vocabulary::people_say()),
    }
}

/// Handles the ask command by running the full pipeline.
fn handle_ask(cmd: &AskCommand, settings: &Settings) -> Result<()> {
    if cmd.question.trim().is_empty() {
        anyhow::bail!("Question cannot be empty");
    }
    let credential = settings.credential();
    if credential.is_blank() {
        anyhow::bail!("GOOGLE_API_KEY is not set; pass --api-key or add it to .env");
    }

    let vocabulary = load_vocabulary(settings)?;
    let mut builder = GeminiClientBuilder::new();
    if let Some(url) = &settings.base_url {
        builder = builder.base_url(url.clone());
    }
    let client = builder.build().context("Failed to create oracle client")?;

    let pipeline = Pipeline::with_oracle(
        Arc::new(client),
        vocabulary,
        &settings.db_path,
        &settings.model,
    );
    let mode = AnalysisMode::resolve(&cmd.mode);
    let result = pipeline.run(&cmd.question, mode, &credential);

    if cmd.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        print_result(&result, mode, cmd.show_query);
    }

    if !result.status.is_success() {
        anyhow::bail!("Question could not be answered ({})", result.status);
    }
    Ok(())
}

fn print_result(result: &PipelineResult, mode: AnalysisMode, show_query: bool) {
    println!("{}", mode.label());
    println!();
    println!("{}", result.summary);

    if !result.sources.is_empty() {
        println!();
        println!("Sources ({}):", result.sources.len());
        for (index, row) in result.sources.iter().enumerate() {
            println!("  {}", format_source_line(index + 1, row));
        }
    }

    if show_query && let Some(query) = &result.query {
        println!();
        println!("Query:");
        for line in query.as_str().lines() {
            println!("  {}", line);
        }
    }
}

/// Formats one source as `N. [title] - participant - excerpt preview`.
fn format_source_line(number: usize, row: &peoplesay::ResultRow) -> String {
    let title = row.text("data_unit_title").unwrap_or_else(|| "Untitled".to_string());
    let participant = row
        .text("participant_name")
        .unwrap_or_else(|| "Unknown participant".to_string());
    let excerpt = row.text("data_unit").unwrap_or_default();

    format!(
        "{}. [{}] - {} - {}",
        number,
        title,
        participant,
        preview(&excerpt, 100)
    )
}

/// Handles the ingest command by rebuilding the database.
fn handle_ingest(cmd: &IngestCommand, settings: &Settings) -> Result<()> {
    ensure_database_directory(&settings.db_path)?;
    let mut db = Database::open(&settings.db_path).context("Failed to open database")?;

    execute_ingest(&cmd.source, &mut db)?;
    println!("    Database: {}", settings.db_path.display());
    Ok(())
}

/// Executes the ingest command logic with a provided database.
///
/// Separated from `handle_ingest` to allow testing with in-memory databases.
fn execute_ingest(source: &Path, db: &mut Database) -> Result<()> {
    let report = peoplesay::ingest_csv(db, source)?;

    println!(
        "Ingested {} entries from {} ({} link rows)",
        report.entries,
        source.display(),
        report.total_link_rows()
    );
    for (attribute, count) in &report.link_rows {
        println!("  {:<22} {:>6}", attribute.table(), count);
    }
    Ok(())
}

fn handle_modes() {
    for mode in AnalysisMode::ALL {
        let marker = if mode == AnalysisMode::default() { "*" } else { " " };
        println!("{} {:<24} {}", marker, mode.label(), mode.description());
    }
}

fn handle_models(settings: &Settings) {
    for (id, description) in AVAILABLE_MODELS {
        let marker = if *id == settings.model { "*" } else { " " };
        println!("{} {:<40} {}", marker, id, description);
    }
}

fn handle_vocabulary(cmd: &VocabularyCommand, settings: &Settings) -> Result<()> {
    let vocabulary = load_vocabulary(settings)?;
    vocabulary
        .validate()
        .context("Vocabulary is invalid")?;

    if cmd.check {
        let values: usize = vocabulary.attributes.iter().map(|a| a.values.len()).sum();
        println!(
            "Vocabulary {} is valid: {} attributes, {} values",
            vocabulary.version,
            vocabulary.attributes.len(),
            values
        );
    } else {
        println!("{}", vocabulary.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplesay::{FieldValue, ResultRow};

    #[test]
    fn empty_question_is_a_user_error() {
        let err = anyhow::anyhow!("Question cannot be empty");
        assert!(is_user_error(&err));
    }

    #[test]
    fn missing_key_is_a_user_error() {
        let err = anyhow::anyhow!("GOOGLE_API_KEY is not set; pass --api-key or add it to .env");
        assert!(is_user_error(&err));
    }

    #[test]
    fn failed_stage_is_an_internal_error() {
        let err = anyhow::anyhow!("Question could not be answered (store_unavailable)");
        assert!(!is_user_error(&err));
    }

    #[test]
    fn status_exit_code_follows_failed_component() {
        use peoplesay::doctor::{HealthStatus, OracleHealth, StoreHealth, health_verdict};

        let store = |status| StoreHealth {
            status,
            file_path: "/tmp/store.db".to_string(),
            entries: 0,
            link_rows: Vec::new(),
            ingested_at: None,
            source: None,
        };
        let oracle = |status| OracleHealth {
            status,
            base_url: String::new(),
            model: "models/gemini-2.0-flash".to_string(),
        };

        let missing_key = health_verdict(
            &store(HealthStatus::Ok),
            &oracle(HealthStatus::Error("GOOGLE_API_KEY is not set".into())),
        )
        .unwrap_err();
        assert!(is_user_error(&missing_key));

        let missing_store = health_verdict(
            &store(HealthStatus::Error("Store not found; run `peoplesay ingest`".into())),
            &oracle(HealthStatus::Ok),
        )
        .unwrap_err();
        assert!(!is_user_error(&missing_store));

        assert!(health_verdict(&store(HealthStatus::Ok), &oracle(HealthStatus::Ok)).is_ok());
    }

    const INGEST_HEADER: &str = "Data Unit [web],Language [web],Data Unit Title [web],Participant Type [web],Participant Name [web],Age [web],Income Range (FPL) [web],Location Type [web],Participant Short Code [web],State [web],Gender [web],Profile Picture [web],Year Conducted Research [web],Full Transcript [web],Subtopics [web],Topics [web],Common Topics [web],Data Type [web],Insurance [web],Race/Ethnicity [web],Out Links";

    #[test]
    fn execute_ingest_fills_in_memory_database() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("export.csv");
        std::fs::write(
            &source,
            format!(
                "{}\n{}\n",
                INGEST_HEADER,
                r#"Dentures cost too much.,English,Dental costs,Older Adult,Ana,65-70,100-138%,Urban,AN-01,Ohio,Woman,,2023,,"Dental, Vision, and Hearing Care [5], Costs of Care [5]",Healthcare [5],Affording Care [7],Direct Quote,Medicaid,Asian,"#
            ),
        )
        .unwrap();
        let mut db = Database::in_memory().unwrap();

        execute_ingest(&source, &mut db).unwrap();

        assert_eq!(db.entry_count().unwrap(), 1);
        assert_eq!(
            db.link_row_count(peoplesay::LinkAttribute::Subtopics).unwrap(),
            2
        );
    }

    #[test]
    fn execute_ingest_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::in_memory().unwrap();

        assert!(execute_ingest(&dir.path().join("absent.csv"), &mut db).is_err());
        assert_eq!(db.entry_count().unwrap(), 0);
    }

    #[test]
    fn source_line_shows_title_participant_and_preview() {
        let row = ResultRow::new()
            .with("entry_id", FieldValue::Integer(3))
            .with_text("data_unit_title", "Dental costs")
            .with_text("participant_name", "Ana")
            .with_text("data_unit", "Dentures\ncost too much.");

        assert_eq!(
            format_source_line(1, &row),
            "1. [Dental costs] - Ana - Dentures cost too much."
        );
    }

    #[test]
    fn source_line_tolerates_missing_fields() {
        let row = ResultRow::new().with("data_unit_title", FieldValue::Null);
        assert_eq!(
            format_source_line(2, &row),
            "2. [Untitled] - Unknown participant - "
        );
    }

    #[test]
    fn overrides_replace_settings() {
        let mut settings = Settings::from_lookup(|_| None).unwrap();
        let overrides = Overrides {
            db: Some(PathBuf::from("/tmp/x.db")),
            model: Some("models/gemini-1.5-flash".to_string()),
            api_key: Some("k".to_string()),
            vocabulary: None,
        };

        apply_overrides(&mut settings, &overrides);

        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.model, "models/gemini-1.5-flash");
        assert_eq!(settings.credential().expose(), "k");
        assert!(settings.vocabulary_path.is_none());
    }

    #[test]
    fn cli_parses_ask_with_flags() {
        let cli = Cli::try_parse_from([
            "peoplesay",
            "ask",
            "What do caregivers say?",
            "--mode",
            "policy",
            "--show-query",
            "--db",
            "/tmp/s.db",
        ])
        .unwrap();

        assert_eq!(cli.overrides.db, Some(PathBuf::from("/tmp/s.db")));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question, "What do caregivers say?");
                assert_eq!(cmd.mode, "policy");
                assert!(cmd.show_query);
                assert!(!cmd.json);
            }
            _ => panic!("expected ask command"),
        }
    }
}
