//! Closed vocabulary of legal values for every categorical field.
//!
//! The vocabulary is part of the contract with the query synthesizer: the
//! generated query may only filter on values listed here. It is kept as data so
//! it can be validated and versioned apart from the prompt text, and can be
//! loaded from a JSON file to track a re-ingested dataset.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version tag of the built-in vocabulary.
pub const BUILTIN_VERSION: &str = "2023.1";

/// Reasons a vocabulary fails validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("vocabulary has no attributes")]
    Empty,

    #[error("attribute name at position {0} is blank")]
    BlankName(usize),

    #[error("attribute '{0}' is listed more than once")]
    DuplicateAttribute(String),

    #[error("attribute '{0}' has no values")]
    NoValues(String),

    #[error("attribute '{0}' contains a blank value")]
    BlankValue(String),

    #[error("attribute '{attribute}' lists '{value}' more than once")]
    DuplicateValue { attribute: String, value: String },
}

/// Allowed values for one categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Display name used in the prompt, e.g. "Income Range (FPL)".
    pub name: String,
    pub values: Vec<String>,
}

impl VocabularyEntry {
    fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Mapping from attribute name to its closed list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub version: String,
    pub attributes: Vec<VocabularyEntry>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::people_say()
    }
}

impl Vocabulary {
    /// Loads a vocabulary from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary file: {}", path.display()))?;
        let vocabulary: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse vocabulary file: {}", path.display()))?;
        vocabulary
            .validate()
            .with_context(|| format!("Invalid vocabulary in {}", path.display()))?;
        Ok(vocabulary)
    }

    /// Checks structural soundness: non-empty, unique names, unique non-blank values.
    pub fn validate(&self) -> Result<(), VocabularyError> {
        if self.attributes.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut names = HashSet::new();
        for (position, entry) in self.attributes.iter().enumerate() {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(VocabularyError::BlankName(position));
            }
            if !names.insert(name.to_lowercase()) {
                return Err(VocabularyError::DuplicateAttribute(name.to_string()));
            }
            if entry.values.is_empty() {
                return Err(VocabularyError::NoValues(name.to_string()));
            }

            let mut values = HashSet::new();
            for value in &entry.values {
                let value = value.trim();
                if value.is_empty() {
                    return Err(VocabularyError::BlankValue(name.to_string()));
                }
                if !values.insert(value) {
                    return Err(VocabularyError::DuplicateValue {
                        attribute: name.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the allowed values for an attribute (case-insensitive name match).
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.values.as_slice())
    }

    /// Returns true if `value` is a legal value of `name`.
    pub fn allows(&self, name: &str, value: &str) -> bool {
        self.values(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    /// Renders the vocabulary as the "Unique Values" section of the synthesis prompt.
    pub fn render(&self) -> String {
        self.attributes
            .iter()
            .map(|entry| format!("    - {}: {}", entry.name, entry.values.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The built-in vocabulary of the People Say dataset.
    pub fn people_say() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            attributes: vec![
                VocabularyEntry::new(
                    "Age",
                    &["65-70", "71-75", "76-80", "81-85", "90-95", "Under 65"],
                ),
                VocabularyEntry::new(
                    "Income Range (FPL)",
                    &[
                        "138-400% Federal Poverty Level",
                        "Above 400% Federal Poverty Level",
                        "Below 138% Federal Poverty Level",
                    ],
                ),
                VocabularyEntry::new("Location Type", &["Rural", "Suburban", "Urban"]),
                VocabularyEntry::new(
                    "State",
                    &[
                        "Alabama",
                        "California",
                        "Iowa",
                        "New York",
                        "Ohio",
                        "Pennsylvania",
                        "Texas",
                    ],
                ),
                VocabularyEntry::new("Gender", &["Man", "Woman"]),
                VocabularyEntry::new("Year Conducted Research", &["2023"]),
                VocabularyEntry::new("Language", &["Cantonese", "English", "Spanish"]),
                VocabularyEntry::new(
                    "Participant Type",
                    &[
                        "Caregiver or Staff",
                        "Older Adult",
                        "Subject-Matter Expert",
                    ],
                ),
                VocabularyEntry::new(
                    "Data Type",
                    &["Direct Quote", "Summary from Transcript", "Video/Audio"],
                ),
                VocabularyEntry::new("Subtopics", SUBTOPICS),
                VocabularyEntry::new(
                    "Topics",
                    &[
                        "Daily Life [1]",
                        "Finances [2]",
                        "Health Insurance [4]",
                        "Health and Well-Being [3]",
                        "Healthcare [5]",
                        "Housing and Home [6]",
                        "Personal Story and Identity [7]",
                        "Policymaking and Innovation [8]",
                    ],
                ),
                VocabularyEntry::new("Common Topics", COMMON_TOPICS),
                VocabularyEntry::new(
                    "Insurance",
                    &[
                        "Federal/State/Union Insurance",
                        "Medicare & Medicaid (Dual Eligible)",
                        "Medicare Advantage",
                        "Medigap",
                        "Military/Veteran Insurance",
                        "Traditional Medicare",
                    ],
                ),
                VocabularyEntry::new(
                    "Race/Ethnicity",
                    &[
                        "African American or Black",
                        "American Indian and Alaska Native",
                        "Asian",
                        "Hispanic or Latino/a",
                        "Non-Hispanic White",
                    ],
                ),
            ],
        }
    }
}

const SUBTOPICS: &[&str] = &[
    "Access to Care [5]",
    "Acute Health Conditions and Management [3]",
    "Adult Day Care [1]",
    "Ageism [7]",
    "Aging in Place [6]",
    "Assets [2]",
    "Assistive Devices [3]",
    "Attitudes towards Policymaking and Systems [8]",
    "Beneficiary Knowledge and Information Needs [4]",
    "Benefits Navigation Support [4]",
    "Caregiver Ecosystem [1]",
    "Changing Home Needs [6]",
    "Chronic Health Conditions and Management [3]",
    "Cognitive Ability [3]",
    "Control and Autonomy [7]",
    "Cultural Competence [7]",
    "Culturally Similar Providers [5]",
    "Current Job [2]",
    "Dental Vision and Hearing Care [5]",
    "Desire to Work [2]",
    "Driving [1]",
    "Drug Coverage [4]",
    "Early Life [7]",
    "Effects of Medications [5]",
    "Elder Abuse/Neglect [1]",
    "End of Life [3]",
    "Exercise [3]",
    "Experience as Caregivers [1]",
    "Experiences Aging [7]",
    "Family Relationships [1]",
    "Federal/State/Union Insurance [4]",
    "Financial Management [2]",
    "Financial Preparedness [2]",
    "Financial Status [2]",
    "Food and Nutrition Services [1]",
    "Fraud and Financial Literacy [2]",
    "Friends [1]",
    "Gender [7]",
    "Geography [6]",
    "Health Attitudes & Perception [3]",
    "Healthcare Costs [4]",
    "Healthcare Experiences [5]",
    "Healthcare Usage [5]",
    "Holistic Care [5]",
    "Home Features [6]",
    "Home Ownership [6]",
    "Hopes for the Future [7]",
    "Household Members [6]",
    "Housing Assistance [6]",
    "Housing Experience [6]",
    "Housing Security/Stability [6]",
    "Housing Type [6]",
    "Immigration [7]",
    "Isolation [1]",
    "Job History [2]",
    "Language [7]",
    "Learning [1]",
    "Legal Issues [1]",
    "Life and Aging Priorities [7]",
    "Medicaid [4]",
    "Medical Discrimination [5]",
    "Medicare [4]",
    "Mental Health [3]",
    "Mentorship [1]",
    "Military/Veteran Insurance [4]",
    "Mindsets and Worldviews [7]",
    "No Insurance [4]",
    "Non-Medical Benefits [4]",
    "Non-Medical Costs and Bills [2]",
    "Non-Medical Insurance [2]",
    "Partnership [1]",
    "Pension [2]",
    "Pets [1]",
    "Pharmacies [5]",
    "Physical Capacity and Mobility [3]",
    "Physical Safety [3]",
    "Physical Therapy [5]",
    "Pilots and Policies [8]",
    "Plan Choice [4]",
    "Policymaking and System Improvement Challenges [8]",
    "Policymaking and System Improvement Opportunities [8]",
    "Prevention and Contributors to Health [3]",
    "Primary Care [5]",
    "Prior Expectations of Aging [7]",
    "Private/Supplemental Insurance [4]",
    "Provider Preferences [5]",
    "Purpose and Fulfillment [7]",
    "Race and Ethnicity [7]",
    "Racism [7]",
    "Religion [7]",
    "Residential Care Setting [6]",
    "Retirement [2]",
    "Routines and Activities [1]",
    "Seeing Others Age [7]",
    "Self-Advocacy [7]",
    "Senior/Community Centers [1]",
    "Sexual Activity [1]",
    "Sexuality [7]",
    "Social Security Benefits [2]",
    "Social Services and Programs [1]",
    "Social/Community Relationships [1]",
    "Specialist Care [5]",
    "Substance Use [3]",
    "System Integration/Fragmentation [5]",
    "Technology [1]",
    "Transportation [1]",
    "Trust/Satisfaction in Care [5]",
];

const COMMON_TOPICS: &[&str] = &[
    "Access to Care [5]",
    "Acute Health Conditions and Management [3]",
    "Adult Day Care [1]",
    "Ageism [7]",
    "Assistive Devices [3]",
    "Attitudes towards Policymaking and Systems [8]",
    "Beneficiary Knowledge and Information Needs [4]",
    "Benefits Navigation Support [4]",
    "Caregiver Ecosystem [1]",
    "Changing Home Needs [6]",
    "Chronic Health Conditions and Management [3]",
    "Cognitive Ability [3]",
    "Control and Autonomy [7]",
    "Current Job [2]",
    "Desire to Work [2]",
    "Driving [1]",
    "Drug Coverage [4]",
    "Early Life [7]",
    "Elder Abuse/Neglect [1]",
    "End of Life [3]",
    "Experience as Caregivers [1]",
    "Experiences Aging [7]",
    "Family Relationships [1]",
    "Financial Management [2]",
    "Financial Preparedness [2]",
    "Financial Status [2]",
    "Food and Nutrition Services [1]",
    "Friends [1]",
    "Geography [6]",
    "Health Attitudes & Perception [3]",
    "Healthcare Costs [4]",
    "Healthcare Experiences [5]",
    "Healthcare Usage [5]",
    "Hopes for the Future [7]",
    "Household Members [6]",
    "Housing Assistance [6]",
    "Housing Experience [6]",
    "Isolation [1]",
    "Job History [2]",
    "Language [7]",
    "Life and Aging Priorities [7]",
    "Medicaid [4]",
    "Medicare [4]",
    "Mental Health [3]",
    "Mindsets and Worldviews [7]",
    "Non-Medical Benefits [4]",
    "Non-Medical Costs and Bills [2]",
    "Partnership [1]",
    "Physical Capacity and Mobility [3]",
    "Pilots and Policies [8]",
    "Plan Choice [4]",
    "Policymaking and System Improvement Challenges [8]",
    "Policymaking and System Improvement Opportunities [8]",
    "Prevention and Contributors to Health [3]",
    "Provider Preferences [5]",
    "Purpose and Fulfillment [7]",
    "Race and Ethnicity [7]",
    "Religion [7]",
    "Residential Care Setting [6]",
    "Retirement [2]",
    "Routines and Activities [1]",
    "Seeing Others Age [7]",
    "Senior/Community Centers [1]",
    "Sexuality [7]",
    "Social Security Benefits [2]",
    "Social/Community Relationships [1]",
    "Specialist Care [5]",
    "Substance Use [3]",
    "System Integration/Fragmentation [5]",
    "Technology [1]",
    "Transportation [1]",
    "Trust/Satisfaction in Care [5]",
];
