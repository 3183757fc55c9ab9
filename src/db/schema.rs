/// Complete schema of the normalized store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// `peoplesay` holds one row per excerpt; every multi-valued attribute has a
/// link table with one row per (entry, value) pair.
pub const INITIAL_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS peoplesay (
    entry_id INTEGER PRIMARY KEY,
    data_unit TEXT,
    language TEXT,
    data_unit_title TEXT,
    participant_type TEXT,
    participant_name TEXT,
    age TEXT,
    income_range_fpl TEXT,
    location_type TEXT,
    participant_short_code TEXT,
    state TEXT,
    gender TEXT,
    profile_picture_url TEXT,
    year_conducted_research INTEGER,
    full_transcript TEXT
);

CREATE TABLE IF NOT EXISTS subtopics_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    subtopics TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topics_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    topics TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS common_topics_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    common_topics TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS data_type_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    data_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS insurance_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    insurance TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS race_ethnicity_table (
    entry_id INTEGER NOT NULL REFERENCES peoplesay(entry_id) ON DELETE CASCADE,
    race_ethnicity TEXT NOT NULL
);

-- Ingestion bookkeeping (ingested_at, source)
CREATE TABLE IF NOT EXISTS store_metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subtopics_entry ON subtopics_table(entry_id);
CREATE INDEX IF NOT EXISTS idx_topics_entry ON topics_table(entry_id);
CREATE INDEX IF NOT EXISTS idx_common_topics_entry ON common_topics_table(entry_id);
CREATE INDEX IF NOT EXISTS idx_data_type_entry ON data_type_table(entry_id);
CREATE INDEX IF NOT EXISTS idx_insurance_entry ON insurance_table(entry_id);
CREATE INDEX IF NOT EXISTS idx_race_ethnicity_entry ON race_ethnicity_table(entry_id);
"#;
