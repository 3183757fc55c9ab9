//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use peoplesay::{Database, IngestReport, ingest_csv};
use tempfile::TempDir;

pub const HEADER: &str = "Data Unit [web],Language [web],Data Unit Title [web],Participant Type [web],Participant Name [web],Age [web],Income Range (FPL) [web],Location Type [web],Participant Short Code [web],State [web],Gender [web],Profile Picture [web],Year Conducted Research [web],Full Transcript [web],Subtopics [web],Topics [web],Common Topics [web],Data Type [web],Insurance [web],Race/Ethnicity [web],Out Links";

/// Three dental-care excerpts and one about housing.
///
/// Entry 2 has two insurance values and entry 3 two race/ethnicity values, so
/// an unaggregated join multiplies their rows.
pub const ROWS: [&str; 4] = [
    r#""I paid for my dentures out of pocket, and it took two years to save.",English,Paying for dentures,Older Adult,Maria,65-70,100-138%,Urban,MA-01,California,Woman,,2023,https://example.org/t/1,"Dental, Vision, and Hearing Care [5], Costs of Care [5]",Healthcare [5],Affording Care [7],Direct Quote,Traditional Medicare,Hispanic or Latino/a,"#,
    r#""The nearest dentist who takes my insurance is two hours away.",English,Driving to the dentist,Older Adult,Joseph,75-80,0-100%,Rural,JO-02,Montana,Man,,2023.0,https://example.org/t/2,"Dental, Vision, and Hearing Care [5], Access to Care [5]",Healthcare [5],Access to Care [7],Direct Quote,"Medicaid, Traditional Medicare",American Indian and Alaska Native,"#,
    r#""My mother lost teeth because the clinic had a year-long waitlist.",English,Waiting for a clinic,Caregiver,Lin,55-60,200-400%,Suburban,LI-03,New York,Woman,,2022,https://example.org/t/3,"Dental, Vision, and Hearing Care [5]",Healthcare [5],Caregiving [7],Paraphrase,Medicare Advantage,"Asian, Hispanic or Latino/a","#,
    r#""Rent went up again and I may have to move in with my son.",English,Rising rent,Older Adult,Grace,80-85,138-200%,Urban,GR-04,Illinois,Woman,,2023,https://example.org/t/4,"Housing Costs [2], Ageism [7]",Housing [2],Aging in Place [7],Direct Quote,Traditional Medicare,African American or Black,"#,
];

/// Titles of the three dental-care excerpts, in entry order.
pub const DENTAL_TITLES: [&str; 3] = [
    "Paying for dentures",
    "Driving to the dentist",
    "Waiting for a clinic",
];

/// Aggregated query selecting the dental-care excerpts.
pub const DENTAL_QUERY: &str = "SELECT
    p.entry_id,
    p.data_unit,
    p.data_unit_title,
    p.participant_name,
    p.age,
    p.income_range_fpl,
    p.location_type,
    p.state,
    p.gender,
    p.participant_type,
    p.language,
    GROUP_CONCAT(DISTINCT re.race_ethnicity) AS participant_race_ethnicity,
    GROUP_CONCAT(DISTINCT ins.insurance) AS participant_insurance,
    GROUP_CONCAT(DISTINCT st.subtopics) AS relevant_subtopics
FROM peoplesay p
LEFT JOIN race_ethnicity_table re ON p.entry_id = re.entry_id
LEFT JOIN insurance_table ins ON p.entry_id = ins.entry_id
JOIN subtopics_table st ON p.entry_id = st.entry_id
WHERE st.subtopics LIKE '%Dental%'
GROUP BY p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age,
    p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language
ORDER BY p.entry_id";

pub fn csv_with_rows(rows: &[&str]) -> String {
    let mut csv = String::from(HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv.push('\n');
    csv
}

/// Writes `contents` to `name` inside `dir`.
pub fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write source file");
    path
}

/// A store file ingested from `ROWS`.
pub struct FixtureStore {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub report: IngestReport,
}

pub fn fixture_store() -> FixtureStore {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let source = write_source(dir.path(), "peoplesay.csv", &csv_with_rows(&ROWS));
    let db_path = dir.path().join("peoplesay.db");

    let mut db = Database::open(&db_path).expect("failed to open store");
    let report = ingest_csv(&mut db, &source).expect("failed to ingest fixture");

    FixtureStore {
        dir,
        db_path,
        report,
    }
}
