//! One-time ingestion of the source spreadsheet into the normalized store.
//!
//! Reads a CSV export with one row per excerpt, assigns dense ids in row order,
//! splits every multi-valued column into link-table rows and replaces whatever
//! the store held before, all inside one transaction.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::params;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::Database;
use crate::models::{Entry, EntryId, LinkAttribute};

/// Source header and destination column for every scalar field.
const SCALAR_COLUMNS: [(&str, &str); 14] = [
    ("Data Unit [web]", "data_unit"),
    ("Language [web]", "language"),
    ("Data Unit Title [web]", "data_unit_title"),
    ("Participant Type [web]", "participant_type"),
    ("Participant Name [web]", "participant_name"),
    ("Age [web]", "age"),
    ("Income Range (FPL) [web]", "income_range_fpl"),
    ("Location Type [web]", "location_type"),
    ("Participant Short Code [web]", "participant_short_code"),
    ("State [web]", "state"),
    ("Gender [web]", "gender"),
    ("Profile Picture [web]", "profile_picture_url"),
    ("Year Conducted Research [web]", "year_conducted_research"),
    ("Full Transcript [web]", "full_transcript"),
];

/// Values whose embedded commas would otherwise split them apart.
///
/// Applied to a multi-valued cell before splitting; the quoted form is tried first.
const SPLIT_REWRITES: [(&str, &str); 2] = [
    (
        "\"Dental, Vision, and Hearing Care [5]\"",
        "Dental Vision and Hearing Care [5]",
    ),
    (
        "Dental, Vision, and Hearing Care [5]",
        "Dental Vision and Hearing Care [5]",
    ),
];

/// Summary of a completed ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub entries: usize,
    pub link_rows: BTreeMap<LinkAttribute, usize>,
    pub ingested_at: OffsetDateTime,
}

impl IngestReport {
    /// Total rows written across all link tables.
    pub fn total_link_rows(&self) -> usize {
        self.link_rows.values().sum()
    }
}

/// Rebuilds the store from the CSV file at `path`.
pub fn ingest_csv(db: &mut Database, path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open source file: {}", path.display()))?;
    ingest_reader(db, file, &path.display().to_string())
}

/// Rebuilds the store from CSV data read from `reader`.
///
/// `source` is recorded in the store metadata.
pub fn ingest_reader<R: Read>(db: &mut Database, reader: R, source: &str) -> Result<IngestReport> {
    let entries = parse_entries(reader)?;
    write_entries(db, &entries, source)
}

/// Parses CSV data into entries with dense ids 1..N.
pub fn parse_entries<R: Read>(reader: R) -> Result<Vec<Entry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read source header row")?
        .clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let column = |header: &str| -> Result<usize> {
        match index.get(header) {
            Some(&i) => Ok(i),
            None => bail!("Source file is missing column '{}'", header),
        }
    };

    let mut scalar_index = Vec::with_capacity(SCALAR_COLUMNS.len());
    for (header, name) in SCALAR_COLUMNS {
        scalar_index.push((name, column(header)?));
    }

    let mut link_index = Vec::with_capacity(LinkAttribute::ALL.len());
    for attribute in LinkAttribute::ALL {
        link_index.push((attribute, column(attribute.source_header())?));
    }

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read source row {}", row + 2))?;
        let mut entry = Entry::new(EntryId::new(row as i64 + 1));

        for (name, position) in &scalar_index {
            assign_scalar(&mut entry, name, cell(&record, *position));
        }

        for (attribute, position) in &link_index {
            let values = record
                .get(*position)
                .map(split_multi_value)
                .unwrap_or_default();
            if !values.is_empty() {
                entry.links.insert(*attribute, values);
            }
        }

        entries.push(entry);
    }

    debug!(entries = entries.len(), "parsed source rows");
    Ok(entries)
}

/// Splits a multi-valued cell on commas.
///
/// Known values containing commas are rewritten first. Each value is trimmed;
/// blanks and repeats are dropped, first occurrence order is kept.
///
/// # Examples
///
/// ```
/// use peoplesay::ingest::split_multi_value;
///
/// let values = split_multi_value("Access to Care [5], Ageism [7]");
/// assert_eq!(values, vec!["Access to Care [5]", "Ageism [7]"]);
/// ```
pub fn split_multi_value(text: &str) -> Vec<String> {
    let mut text = text.to_string();
    for (from, to) in SPLIT_REWRITES {
        if text.contains(from) {
            text = text.replace(from, to);
        }
    }

    let mut values: Vec<String> = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !values.iter().any(|v| v == item) {
            values.push(item.to_string());
        }
    }
    values
}

fn cell(record: &csv::StringRecord, position: usize) -> Option<String> {
    record
        .get(position)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn assign_scalar(entry: &mut Entry, column: &str, value: Option<String>) {
    match column {
        "data_unit" => entry.data_unit = value,
        "language" => entry.language = value,
        "data_unit_title" => entry.data_unit_title = value,
        "participant_type" => entry.participant_type = value,
        "participant_name" => entry.participant_name = value,
        "age" => entry.age = value,
        "income_range_fpl" => entry.income_range_fpl = value,
        "location_type" => entry.location_type = value,
        "participant_short_code" => entry.participant_short_code = value,
        "state" => entry.state = value,
        "gender" => entry.gender = value,
        "profile_picture_url" => entry.profile_picture_url = value,
        "year_conducted_research" => {
            entry.year_conducted_research = value.as_deref().and_then(parse_year)
        }
        "full_transcript" => entry.full_transcript = value,
        _ => {}
    }
}

/// Parses a year cell, accepting spreadsheet-style "2023.0".
fn parse_year(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Replaces all store content with `entries` in a single transaction.
fn write_entries(db: &mut Database, entries: &[Entry], source: &str) -> Result<IngestReport> {
    let ingested_at = OffsetDateTime::now_utc();
    let stamp = ingested_at.format(&Rfc3339)?;

    let tx = db
        .connection_mut()
        .transaction()
        .context("Failed to begin ingestion transaction")?;

    for attribute in LinkAttribute::ALL {
        tx.execute(&format!("DELETE FROM {}", attribute.table()), [])?;
    }
    tx.execute("DELETE FROM peoplesay", [])?;
    tx.execute("DELETE FROM store_metadata", [])?;

    let mut link_rows: BTreeMap<LinkAttribute, usize> =
        LinkAttribute::ALL.iter().map(|a| (*a, 0)).collect();

    {
        let mut insert_entry = tx.prepare(
            "INSERT INTO peoplesay (
                entry_id, data_unit, language, data_unit_title, participant_type,
                participant_name, age, income_range_fpl, location_type,
                participant_short_code, state, gender, profile_picture_url,
                year_conducted_research, full_transcript
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;

        let mut insert_links = Vec::with_capacity(LinkAttribute::ALL.len());
        for attribute in LinkAttribute::ALL {
            let sql = format!(
                "INSERT INTO {} (entry_id, {}) VALUES (?1, ?2)",
                attribute.table(),
                attribute.column()
            );
            insert_links.push((attribute, tx.prepare(&sql)?));
        }

        for entry in entries {
            insert_entry
                .execute(params![
                    entry.id.get(),
                    entry.data_unit,
                    entry.language,
                    entry.data_unit_title,
                    entry.participant_type,
                    entry.participant_name,
                    entry.age,
                    entry.income_range_fpl,
                    entry.location_type,
                    entry.participant_short_code,
                    entry.state,
                    entry.gender,
                    entry.profile_picture_url,
                    entry.year_conducted_research,
                    entry.full_transcript,
                ])
                .with_context(|| format!("Failed to insert entry {}", entry.id))?;

            for (attribute, statement) in insert_links.iter_mut() {
                for value in entry.values(*attribute) {
                    statement.execute(params![entry.id.get(), value])?;
                    *link_rows.entry(*attribute).or_default() += 1;
                }
            }
        }

        let mut insert_meta =
            tx.prepare("INSERT INTO store_metadata (key, value) VALUES (?1, ?2)")?;
        insert_meta.execute(params!["ingested_at", stamp])?;
        insert_meta.execute(params!["source", source])?;
        insert_meta.execute(params!["entries", entries.len().to_string()])?;
    }

    tx.commit().context("Failed to commit ingestion")?;

    info!(
        entries = entries.len(),
        link_rows = link_rows.values().sum::<usize>(),
        source,
        "store rebuilt"
    );

    Ok(IngestReport {
        entries: entries.len(),
        link_rows,
        ingested_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Data Unit [web],Language [web],Data Unit Title [web],Participant Type [web],Participant Name [web],Age [web],Income Range (FPL) [web],Location Type [web],Participant Short Code [web],State [web],Gender [web],Profile Picture [web],Year Conducted Research [web],Full Transcript [web],Subtopics [web],Topics [web],Common Topics [web],Data Type [web],Insurance [web],Race/Ethnicity [web],Out Links";

    fn csv_with_rows(rows: &[&str]) -> String {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        csv
    }

    #[test]
    fn split_trims_and_drops_blanks() {
        assert_eq!(
            split_multi_value(" Access to Care [5] ,, Ageism [7] ,"),
            vec!["Access to Care [5]", "Ageism [7]"]
        );
        assert!(split_multi_value("  ").is_empty());
    }

    #[test]
    fn split_rewrites_embedded_comma_value() {
        assert_eq!(
            split_multi_value("\"Dental, Vision, and Hearing Care [5]\", Primary Care [5]"),
            vec!["Dental Vision and Hearing Care [5]", "Primary Care [5]"]
        );
        assert_eq!(
            split_multi_value("Dental, Vision, and Hearing Care [5]"),
            vec!["Dental Vision and Hearing Care [5]"]
        );
    }

    #[test]
    fn split_drops_repeated_values() {
        assert_eq!(split_multi_value("Asian, Asian"), vec!["Asian"]);
    }

    #[test]
    fn parse_year_accepts_float_form() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year("2023.5"), None);
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn parse_entries_assigns_dense_ids() {
        let csv = csv_with_rows(&[
            "First excerpt,English,Title A,Older Adult,Ann,65-70,,Urban,A1,Ohio,Woman,,2023,,Ageism [7],,,,,Asian,",
            "Second excerpt,Spanish,Title B,Older Adult,Bea,71-75,,Rural,B1,Texas,Woman,,2023,,,,,,,,",
        ]);

        let entries = parse_entries(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, EntryId::new(1));
        assert_eq!(entries[1].id, EntryId::new(2));
        assert_eq!(entries[0].data_unit_title.as_deref(), Some("Title A"));
        assert_eq!(entries[0].income_range_fpl, None);
        assert_eq!(entries[0].year_conducted_research, Some(2023));
        assert_eq!(entries[1].link_row_count(), 0);
    }

    #[test]
    fn parse_entries_reports_missing_column() {
        let csv = "Data Unit [web],Language [web]\nx,English";
        let err = parse_entries(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing column"));
    }

    #[test]
    fn subtopic_cell_yields_one_link_row_per_value() {
        let csv = csv_with_rows(&[
            "Excerpt,English,Title A,Older Adult,Ann,65-70,,Urban,A1,Ohio,Woman,,2023,,\"Access to Care [5], Ageism [7]\",Healthcare [5],,Direct Quote,Medigap,Asian,",
        ]);
        let mut db = Database::in_memory().unwrap();

        let report = ingest_reader(&mut db, csv.as_bytes(), "test.csv").unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.link_rows[&LinkAttribute::Subtopics], 2);
        assert_eq!(report.link_rows[&LinkAttribute::CommonTopics], 0);

        let subtopics: Vec<String> = db
            .connection()
            .prepare("SELECT subtopics FROM subtopics_table WHERE entry_id = 1 ORDER BY rowid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(subtopics, vec!["Access to Care [5]", "Ageism [7]"]);
    }

    #[test]
    fn reingest_replaces_prior_content() {
        let first = csv_with_rows(&[
            "One,English,T1,Older Adult,Ann,65-70,,Urban,A1,Ohio,Woman,,2023,,Ageism [7],,,,,Asian,",
            "Two,English,T2,Older Adult,Bo,65-70,,Urban,B1,Ohio,Man,,2023,,Ageism [7],,,,,Asian,",
        ]);
        let second = csv_with_rows(&[
            "Three,English,T3,Older Adult,Cy,65-70,,Urban,C1,Iowa,Man,,2023,,Pets [1],,,,,,",
        ]);
        let mut db = Database::in_memory().unwrap();

        ingest_reader(&mut db, first.as_bytes(), "first.csv").unwrap();
        ingest_reader(&mut db, second.as_bytes(), "second.csv").unwrap();

        assert_eq!(db.entry_count().unwrap(), 1);
        assert_eq!(db.link_row_count(LinkAttribute::Subtopics).unwrap(), 1);
        assert_eq!(db.link_row_count(LinkAttribute::RaceEthnicity).unwrap(), 0);
        assert_eq!(db.metadata("source").unwrap().as_deref(), Some("second.csv"));
        assert!(db.metadata("ingested_at").unwrap().is_some());
    }
}
