//! Natural-language question to structured query.
//!
//! The synthesizer embeds the store schema, the closed vocabulary, the
//! aggregation rules and a worked example in one prompt, asks the oracle for a
//! query, and applies a single syntactic gate: the cleaned text must contain
//! `SELECT`. Nothing deeper is parsed; the oracle is trusted to follow the rules.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Credential, StructuredQuery};
use crate::oracle::{GenerativeOracle, OracleError};
use crate::prompt;
use crate::vocabulary::Vocabulary;

/// Prompt template for query synthesis.
///
/// Placeholders: `{vocabulary}`, `{user_query}`.
const SYNTHESIS_TEMPLATE: &str = r#"You are an expert in SQL and database querying. Given the database schema and the allowed values for each field below, write one SQLite query that retrieves the data needed to answer the user's question.

The database is The People Say: first-hand insights from older adults and caregivers on the issues most important to them, with a focus on communities often under-consulted in policymaking (older adults of color, people with low income, and people in rural areas).

**Database Schema:**

- **peoplesay** table (main table, one row per interview excerpt):
  - entry_id (INTEGER, PRIMARY KEY): Unique identifier for each entry.
  - data_unit (TEXT): The excerpt text.
  - language (TEXT): Language of the interview clip (e.g., "English").
  - data_unit_title (TEXT): Title of the excerpt, used for citations.
  - participant_type (TEXT): Type of participant (e.g., "Older Adult").
  - participant_name (TEXT): Name of the participant.
  - age (TEXT): Age bracket (e.g., "65-70").
  - income_range_fpl (TEXT): Income as a share of the Federal Poverty Level.
  - location_type (TEXT): Type of location (e.g., "Urban").
  - participant_short_code (TEXT): Internal short code for the participant.
  - state (TEXT): State name (e.g., "California").
  - gender (TEXT): Gender of the participant (e.g., "Man").
  - profile_picture_url (TEXT): URL of the participant's profile picture.
  - year_conducted_research (INTEGER): Year of the research (e.g., 2023).
  - full_transcript (TEXT): URL or path of the full transcript.

- Link tables, each with one row per (entry, value) pair, joined on entry_id:
  - **subtopics_table**(entry_id, subtopics), e.g. "Dental Vision and Hearing Care [5]"
  - **topics_table**(entry_id, topics), e.g. "Healthcare [5]"
  - **common_topics_table**(entry_id, common_topics), e.g. "Experiences Aging [7]"
  - **data_type_table**(entry_id, data_type), e.g. "Direct Quote"
  - **insurance_table**(entry_id, insurance), e.g. "Traditional Medicare"
  - **race_ethnicity_table**(entry_id, race_ethnicity), e.g. "Asian"

**Allowed Values:**
{vocabulary}

**User Question:**
{user_query}

**Rules:**
- Generate ONLY the SQL query. It must be a single read-only SELECT statement.
- Alias peoplesay as p and always select: p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age, p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language. Other p columns may be added.
- Always join race/ethnicity and insurance and aggregate them:
  - LEFT JOIN race_ethnicity_table re ON p.entry_id = re.entry_id
  - LEFT JOIN insurance_table ins ON p.entry_id = ins.entry_id
  - GROUP_CONCAT(DISTINCT re.race_ethnicity) AS participant_race_ethnicity
  - GROUP_CONCAT(DISTINCT ins.insurance) AS participant_insurance
- For filters on other link tables use these aliases: subtopics_table st, topics_table t, common_topics_table ct, data_type_table dt.
- Use LIKE for partial matches on topic-like fields. Use = for categorical fields (race/ethnicity, language, age, state, gender, participant type) when the user names a value from the allowed list.
- Joining a link table can multiply rows. You MUST return at most one row per entry: add GROUP BY p.entry_id (plus every selected p column) and aggregate each joined link value with GROUP_CONCAT(DISTINCT alias.column).
- Do not wrap the query in markdown code blocks and do not add any explanation.

**Example:**
For the question "What do older adults from Tribal communities say about specialist care?":
SELECT
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
FROM
    peoplesay p
LEFT JOIN
    race_ethnicity_table re ON p.entry_id = re.entry_id
LEFT JOIN
    insurance_table ins ON p.entry_id = ins.entry_id
JOIN
    subtopics_table st ON p.entry_id = st.entry_id
WHERE
    p.entry_id IN (SELECT entry_id FROM race_ethnicity_table WHERE race_ethnicity = 'American Indian and Alaska Native')
    AND st.subtopics LIKE '%Specialist Care%'
    AND p.participant_type = 'Older Adult'
GROUP BY
    p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age, p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language;

SQL QUERY:"#;

/// Why a query could not be synthesized.
///
/// Every variant collapses to the same user-facing message; the variant itself
/// is only logged.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("no API key supplied")]
    MissingCredential,

    #[error("API key check failed: {0}")]
    Credential(#[source] OracleError),

    #[error("oracle call failed: {0}")]
    Oracle(#[source] OracleError),

    #[error("oracle returned an empty response")]
    EmptyResponse,

    #[error("response is not a SELECT query: {0}")]
    NotSelect(String),
}

/// Turns questions into structured queries using a generative oracle.
pub struct QuerySynthesizer {
    oracle: Arc<dyn GenerativeOracle>,
    vocabulary: Vocabulary,
}

impl QuerySynthesizer {
    /// Creates a synthesizer using the built-in vocabulary.
    pub fn new(oracle: Arc<dyn GenerativeOracle>) -> Self {
        Self {
            oracle,
            vocabulary: Vocabulary::people_say(),
        }
    }

    /// Replaces the vocabulary embedded in the prompt.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Renders the full synthesis prompt for `question`.
    pub fn build_prompt(&self, question: &str) -> String {
        let vocabulary = self.vocabulary.render();
        prompt::render(SYNTHESIS_TEMPLATE, &[
            ("vocabulary", vocabulary.as_str()),
            ("user_query", question),
        ])
    }

    /// Generates a structured query answering `question`.
    ///
    /// Makes one credential probe and one generation call; no retries.
    pub fn synthesize(
        &self,
        model: &str,
        question: &str,
        credential: &Credential,
    ) -> Result<StructuredQuery, SynthesisError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SynthesisError::EmptyQuestion);
        }
        if credential.is_blank() {
            return Err(SynthesisError::MissingCredential);
        }
        self.oracle
            .verify_credential(credential)
            .map_err(SynthesisError::Credential)?;

        let prompt = self.build_prompt(question);
        debug!(model, prompt_len = prompt.len(), "requesting structured query");

        let response = self
            .oracle
            .generate(model, &prompt, credential)
            .map_err(SynthesisError::Oracle)?;

        if response.trim().is_empty() {
            warn!("oracle response for query synthesis was empty");
            return Err(SynthesisError::EmptyResponse);
        }

        let query = StructuredQuery::new(strip_code_fence(&response));
        if !query.is_select() {
            warn!(response = %query.preview(500), "generated text is not a SELECT query");
            return Err(SynthesisError::NotSelect(query.preview(200)));
        }

        info!(query = %query.preview(500), "generated structured query");
        Ok(query)
    }
}

/// Removes a surrounding markdown code fence and trims whitespace.
///
/// Handles an opening fence with or without a language tag (```` ```sql ````)
/// and a closing fence on its own or at the end of the last line.
fn strip_code_fence(response: &str) -> String {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag, if any, up to the end of the fence line.
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::StubOracle;

    const VALID_QUERY: &str = "SELECT p.entry_id FROM peoplesay p GROUP BY p.entry_id";

    fn key() -> Credential {
        Credential::new("test-key")
    }

    fn synthesizer(oracle: StubOracle) -> QuerySynthesizer {
        QuerySynthesizer::new(Arc::new(oracle))
    }

    /// The example query embedded in the synthesis prompt.
    fn worked_example() -> &'static str {
        let start = SYNTHESIS_TEMPLATE.find("\nSELECT\n").unwrap() + 1;
        let end = SYNTHESIS_TEMPLATE.rfind(";\n\nSQL QUERY:").unwrap();
        &SYNTHESIS_TEMPLATE[start..end]
    }

    #[test]
    fn worked_example_returns_one_row_per_entry() {
        use crate::db::Database;
        use crate::executor::QueryExecutor;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute_batch(
                "INSERT INTO peoplesay (entry_id, data_unit, data_unit_title, participant_name, participant_type)
                 VALUES (1, 'The cardiologist is a day away.', 'Specialists far away', 'Joseph', 'Older Adult'),
                        (2, 'I see my dentist yearly.', 'Yearly dentist', 'Maria', 'Older Adult');
                 INSERT INTO race_ethnicity_table (entry_id, race_ethnicity) VALUES
                        (1, 'American Indian and Alaska Native'),
                        (1, 'Hispanic or Latino/a'),
                        (2, 'Hispanic or Latino/a');
                 INSERT INTO insurance_table (entry_id, insurance) VALUES
                        (1, 'Medicaid'),
                        (1, 'Traditional Medicare');
                 INSERT INTO subtopics_table (entry_id, subtopics) VALUES
                        (1, 'Specialist Care [5]'),
                        (1, 'Access to Care [5]'),
                        (2, 'Dental Vision and Hearing Care [5]');",
            )
            .unwrap();
        drop(db);

        let query = StructuredQuery::new(worked_example());
        assert!(query.is_select());
        let result = QueryExecutor::new(&path).execute(&query).unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.duplicate_entry_ids().is_empty());
        let row = &result.rows()[0];
        assert_eq!(row.entry_id(), Some(1));
        assert!(row.text("participant_insurance").unwrap().contains("Medicaid"));
        assert!(row.get("relevant_subtopics").is_some());
    }

    #[test]
    fn strip_code_fence_with_language_tag() {
        let response = "```sql\nSELECT * FROM peoplesay;\n```";
        assert_eq!(strip_code_fence(response), "SELECT * FROM peoplesay;");
    }

    #[test]
    fn strip_code_fence_without_language_tag() {
        let response = "  ```\nSELECT 1\n```  ";
        assert_eq!(strip_code_fence(response), "SELECT 1");
    }

    #[test]
    fn strip_code_fence_on_single_line() {
        assert_eq!(strip_code_fence("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("\n SELECT 1 \n"), "SELECT 1");
    }

    #[test]
    fn prompt_embeds_vocabulary_rules_and_question() {
        let synthesizer = synthesizer(StubOracle::new());
        let prompt = synthesizer.build_prompt("What do older adults say about dental care?");

        assert!(prompt.contains("What do older adults say about dental care?"));
        assert!(prompt.contains("    - Race/Ethnicity: African American or Black"));
        assert!(prompt.contains("GROUP BY p.entry_id"));
        assert!(prompt.contains("GROUP_CONCAT(DISTINCT"));
        assert!(!prompt.contains("{vocabulary}"));
        assert!(!prompt.contains("{user_query}"));
    }

    #[test]
    fn prompt_uses_replacement_vocabulary() {
        let vocabulary: Vocabulary = serde_json::from_str(
            r#"{"version": "t", "attributes": [{"name": "Planet", "values": ["Mars"]}]}"#,
        )
        .unwrap();
        let synthesizer = synthesizer(StubOracle::new()).with_vocabulary(vocabulary);

        let prompt = synthesizer.build_prompt("q");
        assert!(prompt.contains("    - Planet: Mars"));
        assert!(!prompt.contains("Race/Ethnicity: African"));
    }

    #[test]
    fn synthesize_returns_cleaned_query() {
        let oracle = StubOracle::new().default_reply(format!("```sql\n{}\n```", VALID_QUERY));
        let query = synthesizer(oracle)
            .synthesize("model", "question", &key())
            .unwrap();
        assert_eq!(query.as_str(), VALID_QUERY);
    }

    #[test]
    fn synthesize_rejects_text_without_select() {
        let oracle = StubOracle::new().default_reply("I am unable to help with that.");
        let err = synthesizer(oracle)
            .synthesize("model", "question", &key())
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NotSelect(_)));
    }

    #[test]
    fn synthesize_rejects_empty_question_without_calling_oracle() {
        let oracle = Arc::new(StubOracle::new().default_reply(VALID_QUERY));
        let synthesizer = QuerySynthesizer::new(oracle.clone());

        let err = synthesizer.synthesize("model", "   ", &key()).unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyQuestion));
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn synthesize_rejects_missing_and_invalid_credentials() {
        let err = synthesizer(StubOracle::new().default_reply(VALID_QUERY))
            .synthesize("model", "question", &Credential::new(""))
            .unwrap_err();
        assert!(matches!(err, SynthesisError::MissingCredential));

        let oracle = StubOracle::new()
            .default_reply(VALID_QUERY)
            .rejecting_credentials();
        let err = synthesizer(oracle)
            .synthesize("model", "question", &key())
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Credential(_)));
    }

    #[test]
    fn synthesize_maps_oracle_failure_and_empty_response() {
        let oracle = StubOracle::new().fail_when("SQL", "quota exceeded");
        let err = synthesizer(oracle)
            .synthesize("model", "question", &key())
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Oracle(_)));

        let oracle = StubOracle::new().default_reply("  \n ");
        let err = synthesizer(oracle)
            .synthesize("model", "question", &key())
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyResponse));
    }
}
