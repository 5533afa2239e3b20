//! Intake instructions: the declarative description of what the model should
//! elicit and how it must report back, and the system prompt built from it.

use super::classification::ClassificationField;
use crate::error::ConfigError;

/// First assistant message of every session.
pub const GREETING: &str = "Hi — what brings you here today?";

/// One labeled line of the classification record, with an optional value hint
/// shown to the model (e.g. the allowed severities).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    pub field: ClassificationField,
    pub hint: Option<String>,
}

impl OutputField {
    fn new(field: ClassificationField) -> Self {
        Self { field, hint: None }
    }

    fn hinted(field: ClassificationField, hint: &str) -> Self {
        Self {
            field,
            hint: Some(hint.to_string()),
        }
    }
}

/// Everything the system prompt is generated from.
#[derive(Debug, Clone)]
pub struct IntakeInstructions {
    /// Who the model is playing.
    pub persona: String,
    /// Conversational rules, one per bullet.
    pub tone_rules: Vec<String>,
    /// Facts to collect, in the order they should be asked about.
    pub facts: Vec<String>,
    /// Labeled fields of the final record. The first one carries the marker.
    pub output_fields: Vec<OutputField>,
}

impl Default for IntakeInstructions {
    fn default() -> Self {
        use ClassificationField::*;
        Self {
            persona: "You are a mental wellness intake assistant.".to_string(),
            tone_rules: vec![
                "Ask one question at a time".to_string(),
                "Keep questions short".to_string(),
                "Be supportive and neutral".to_string(),
            ],
            facts: ["issue", "severity", "duration", "context", "preference"]
                .into_iter()
                .map(String::from)
                .collect(),
            output_fields: vec![
                OutputField::new(IssueCluster),
                OutputField::hinted(Severity, "low/medium/high"),
                OutputField::hinted(Context, "work/personal/both"),
                OutputField::new(PreferredStyle),
                OutputField::new(RecommendedExpert),
                OutputField::new(RecommendedFormat),
                OutputField::new(UrgencyLevel),
                OutputField::new(Summary),
            ],
        }
    }
}

impl IntakeInstructions {
    /// Check that a prompt built from these instructions can actually be
    /// detected and parsed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.facts.iter().all(|f| f.trim().is_empty()) {
            return Err(ConfigError::InvalidInstructions(
                "at least one fact to collect is required".to_string(),
            ));
        }
        match self.output_fields.first() {
            Some(first) if first.field == ClassificationField::IssueCluster => {}
            Some(first) => {
                return Err(ConfigError::InvalidInstructions(format!(
                    "record must start with ISSUE_CLUSTER, not {}",
                    first.field
                )));
            }
            None => {
                return Err(ConfigError::InvalidInstructions(
                    "record needs at least one output field".to_string(),
                ));
            }
        }
        for (i, field) in self.output_fields.iter().enumerate() {
            if self.output_fields[..i].iter().any(|f| f.field == field.field) {
                return Err(ConfigError::InvalidInstructions(format!(
                    "duplicate output field {}",
                    field.field
                )));
            }
        }
        Ok(())
    }

    /// The exact record template the model is told to emit.
    pub fn record_template(&self) -> String {
        self.output_fields
            .iter()
            .map(|f| match &f.hint {
                Some(hint) => format!("{}: ({})", f.field, hint),
                None => format!("{}:", f.field),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the system prompt sent ahead of every turn.
    pub fn system_prompt(&self) -> String {
        let rules = self
            .tone_rules
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n");
        let facts = self
            .facts
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{persona}\n\n\
             Rules:\n\
             {rules}\n\
             - Collect: {facts}\n\n\
             After enough info, output structured classification.\n\n\
             Return EXACTLY in this format:\n\n\
             {template}\n\n\
             Do not output this until enough info is collected.",
            persona = self.persona,
            template = self.record_template(),
        )
    }
}
