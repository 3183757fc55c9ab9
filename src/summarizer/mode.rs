//! Analysis modes and their summary templates.

use std::fmt;

use serde::Serialize;
use tracing::warn;

const THEMATIC_TEMPLATE: &str = r#"You are an expert qualitative researcher analyzing data from the People Say database, which features first-hand insights from older adults and caregivers, particularly from underrepresented communities.

User Query: "{user_query}"

Based *only* on the following data excerpts, conduct a thematic analysis that answers the user's query. Identify recurring themes, patterns and concepts.

Instructions:
1. **Identify Primary Themes**: Recognize recurring patterns, concepts or sentiments in the data.
2. **Extract Illustrative Quotes**: For each theme, pick the quotes that best illustrate it.
3. **Note Demographic Patterns**: Where relevant, describe how themes vary across demographic groups (age, race/ethnicity, location type).
4. **Consider Outliers**: Highlight notable exceptions or contrasting viewpoints.
5. **Maintain Voice**: Preserve the authentic voices and perspectives of participants.
6. **Cite Sources**: Use the format [Source ID] for all information, where Source ID is the bracketed title of the excerpt.
7. **Structure Your Analysis**: Present your findings under clear thematic headings.
8. **Stay Within the Data**: Do not make claims unsupported by the provided excerpts.

Retrieved Data Excerpts:
---
{retrieved_data}
---

Thematic Analysis:
"#;

const NARRATIVE_TEMPLATE: &str = r#"You are an expert qualitative researcher analyzing data from the People Say database, which features first-hand insights from older adults and caregivers, particularly from underrepresented communities.

User Query: "{user_query}"

Based *only* on the following data excerpts, analyze the narrative elements, storylines and personal experiences that answer the user's query.

Instructions:
1. **Identify Key Narratives**: Describe the key narratives and story arcs in participants' accounts.
2. **Positions**: Note how participants position themselves and others in their stories.
3. **Temporal Aspects**: Examine past experiences, present situations and future outlooks.
4. **Emotional Components**: Highlight emotional components and tone.
5. **Cite Sources**: Use the format [Source ID] for all information, where Source ID is the bracketed title of the excerpt.
6. **Structure Your Analysis**: Present your findings under clear narrative headings.
7. **Stay Within the Data**: Do not make claims unsupported by the provided excerpts. If the data is insufficient to support a claim, say so.

Retrieved Data Excerpts:
---
{retrieved_data}
---

Narrative Analysis:
"#;

const DEMOGRAPHIC_TEMPLATE: &str = r#"You are a researcher analyzing how experiences vary across demographic groups in the People Say database.

User Query: "{user_query}"

Based *only* on the following data excerpts, compare and contrast perspectives across demographic categories.

Instructions:
1. Identify similarities and differences based on age, race/ethnicity, location type, income and insurance.
2. Note unique challenges or opportunities mentioned by specific groups.
3. Avoid overgeneralizing from limited data.
4. Cite sources using the format [Source ID] for all information, where Source ID is the bracketed title of the excerpt.
5. Organize findings by demographic variable or by theme, whichever shows the patterns more clearly.
6. Do not make claims unsupported by the provided excerpts.

Retrieved Data Excerpts:
---
{retrieved_data}
---

Demographic Comparison:
"#;

const POLICY_TEMPLATE: &str = r#"You are a policy analyst extracting actionable insights from the People Say database.

User Query: "{user_query}"

Based *only* on the following data excerpts, identify policy-relevant insights.

Instructions:
1. Identify system gaps, barriers and challenges mentioned by participants.
2. Note participant suggestions for improvement.
3. Connect participant experiences to existing policy contexts when the excerpts make them evident.
4. Do not make policy recommendations that the data does not directly support.
5. Cite sources using the format [Source ID] for all information, where Source ID is the bracketed title of the excerpt.

Retrieved Data Excerpts:
---
{retrieved_data}
---

Policy Implications Analysis:
"#;

/// How the summarizer instructs the oracle to analyze retrieved excerpts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Thematic,
    Narrative,
    DemographicComparison,
    PolicyImplications,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::Thematic,
        AnalysisMode::Narrative,
        AnalysisMode::DemographicComparison,
        AnalysisMode::PolicyImplications,
    ];

    /// Parses a mode from its label or a snake/kebab-case name, ignoring case.
    ///
    /// `"Thematic Analysis"`, `"thematic"` and `"thematic-analysis"` all parse to
    /// `Thematic`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ");
        match normalized.as_str() {
            "thematic" | "thematic analysis" => Some(Self::Thematic),
            "narrative" | "narrative analysis" => Some(Self::Narrative),
            "demographic" | "demographic comparison" => Some(Self::DemographicComparison),
            "policy" | "policy implications" | "policy implications analysis" => {
                Some(Self::PolicyImplications)
            }
            _ => None,
        }
    }

    /// Parses `s`, falling back to `Thematic` when it names no known mode.
    pub fn resolve(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!(mode = s, "unknown analysis mode, using Thematic Analysis");
            Self::default()
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Thematic => "Thematic Analysis",
            Self::Narrative => "Narrative Analysis",
            Self::DemographicComparison => "Demographic Comparison",
            Self::PolicyImplications => "Policy Implications",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Thematic => {
                "Identifies recurring patterns, concepts, and themes across participants."
            }
            Self::Narrative => {
                "Focuses on storytelling elements and how participants construct their experiences."
            }
            Self::DemographicComparison => {
                "Compares experiences across different demographic groups."
            }
            Self::PolicyImplications => {
                "Extracts insights relevant to policy development and system improvements."
            }
        }
    }

    /// Summary template with `{user_query}` and `{retrieved_data}` placeholders.
    pub fn template(self) -> &'static str {
        match self {
            Self::Thematic => THEMATIC_TEMPLATE,
            Self::Narrative => NARRATIVE_TEMPLATE,
            Self::DemographicComparison => DEMOGRAPHIC_TEMPLATE,
            Self::PolicyImplications => POLICY_TEMPLATE,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
