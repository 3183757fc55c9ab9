//! Ingestion into a file-backed store and querying it back.
mod common;

use anyhow::Result;
use common::{DENTAL_QUERY, ROWS, csv_with_rows, fixture_store, write_source};
use peoplesay::{Database, LinkAttribute, QueryExecutor, StructuredQuery, ingest_csv};

fn link_values(db: &Database, attribute: LinkAttribute, entry_id: i64) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE entry_id = ?1 ORDER BY rowid",
        attribute.column(),
        attribute.table()
    );
    let mut stmt = db.connection().prepare(&sql)?;
    let values = stmt
        .query_map([entry_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

#[test]
fn fixture_ingest_reports_counts() -> Result<()> {
    let store = fixture_store();

    assert_eq!(store.report.entries, 4);
    assert_eq!(store.report.link_rows[&LinkAttribute::Subtopics], 7);
    assert_eq!(store.report.link_rows[&LinkAttribute::RaceEthnicity], 5);
    assert_eq!(store.report.link_rows[&LinkAttribute::Insurance], 5);

    let db = Database::open(&store.db_path)?;
    assert_eq!(db.entry_count()?, 4);
    assert_eq!(db.link_row_count(LinkAttribute::Subtopics)?, 7);
    assert!(db.metadata("ingested_at")?.is_some());
    assert!(db.metadata("source")?.unwrap_or_default().ends_with("peoplesay.csv"));
    Ok(())
}

#[test]
fn comma_separated_values_become_trimmed_link_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let row = r#""Excerpt",English,Title,Older Adult,Ana,65-70,0-100%,Urban,AN-1,Ohio,Woman,,2023,,"Access to Care [5],   Ageism [7] ",,,,,,"#;
    let source = write_source(dir.path(), "one.csv", &csv_with_rows(&[row]));

    let mut db = Database::open(dir.path().join("store.db"))?;
    ingest_csv(&mut db, &source)?;

    assert_eq!(
        link_values(&db, LinkAttribute::Subtopics, 1)?,
        vec!["Access to Care [5]", "Ageism [7]"]
    );
    assert!(link_values(&db, LinkAttribute::Topics, 1)?.is_empty());
    Ok(())
}

#[test]
fn embedded_comma_value_is_kept_whole() -> Result<()> {
    let store = fixture_store();
    let db = Database::open(&store.db_path)?;

    assert_eq!(
        link_values(&db, LinkAttribute::Subtopics, 1)?,
        vec!["Dental Vision and Hearing Care [5]", "Costs of Care [5]"]
    );
    Ok(())
}

#[test]
fn ids_are_dense_in_row_order() -> Result<()> {
    let store = fixture_store();
    let db = Database::open(&store.db_path)?;

    let mut stmt = db
        .connection()
        .prepare("SELECT entry_id, data_unit_title, year_conducted_research FROM peoplesay ORDER BY entry_id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let ids: Vec<i64> = rows.iter().map(|r| r.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(rows[0].1, "Paying for dentures");
    // "2023.0" in the source parses as a year.
    assert_eq!(rows[1].2, Some(2023));
    Ok(())
}

#[test]
fn aggregated_query_yields_one_row_per_entry() -> Result<()> {
    let store = fixture_store();
    let executor = QueryExecutor::new(&store.db_path);

    let result = executor.execute(&StructuredQuery::new(DENTAL_QUERY))?;

    assert_eq!(result.len(), 3);
    assert!(result.duplicate_entry_ids().is_empty());
    let races = result.rows()[2]
        .text("participant_race_ethnicity")
        .unwrap_or_default();
    assert!(races.contains("Asian"));
    assert!(races.contains("Hispanic or Latino/a"));
    Ok(())
}

#[test]
fn unaggregated_join_multiplies_rows() -> Result<()> {
    let store = fixture_store();
    let executor = QueryExecutor::new(&store.db_path);

    let result = executor.execute(&StructuredQuery::new(
        "SELECT p.entry_id FROM peoplesay p \
         JOIN race_ethnicity_table re ON p.entry_id = re.entry_id",
    ))?;

    assert_eq!(result.len(), 5);
    assert_eq!(result.duplicate_entry_ids(), vec![3]);
    Ok(())
}

#[test]
fn reingest_replaces_previous_content() -> Result<()> {
    let store = fixture_store();
    let source = write_source(store.dir.path(), "smaller.csv", &csv_with_rows(&ROWS[3..]));

    let mut db = Database::open(&store.db_path)?;
    let report = ingest_csv(&mut db, &source)?;

    assert_eq!(report.entries, 1);
    assert_eq!(db.entry_count()?, 1);
    assert_eq!(db.link_row_count(LinkAttribute::RaceEthnicity)?, 1);
    assert!(db.metadata("source")?.unwrap_or_default().ends_with("smaller.csv"));
    Ok(())
}

#[test]
fn missing_column_is_named_and_store_untouched() -> Result<()> {
    let store = fixture_store();
    let header_without_state = common::HEADER.replace("State [web],", "");
    let source = write_source(store.dir.path(), "broken.csv", &header_without_state);

    let mut db = Database::open(&store.db_path)?;
    let err = ingest_csv(&mut db, &source).unwrap_err();

    assert!(err.to_string().contains("State [web]"));
    assert_eq!(db.entry_count()?, 4);
    Ok(())
}
