//! Detection of the structured classification record in assistant replies.
//!
//! Two levels are offered. [`is_classification`] is the plain marker test
//! the rest of the flow keys off. [`parse_classification`] additionally
//! reads the labeled fields so callers can tell a complete record from one
//! the model only started.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Literal token that opens every classification record.
pub const CLASSIFICATION_MARKER: &str = "ISSUE_CLUSTER:";

/// The labeled fields of a classification record, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationField {
    IssueCluster,
    Severity,
    Context,
    PreferredStyle,
    RecommendedExpert,
    RecommendedFormat,
    UrgencyLevel,
    Summary,
}

impl ClassificationField {
    pub const ALL: [ClassificationField; 8] = [
        Self::IssueCluster,
        Self::Severity,
        Self::Context,
        Self::PreferredStyle,
        Self::RecommendedExpert,
        Self::RecommendedFormat,
        Self::UrgencyLevel,
        Self::Summary,
    ];

    /// Label as it appears in the record, without the colon.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IssueCluster => "ISSUE_CLUSTER",
            Self::Severity => "SEVERITY",
            Self::Context => "CONTEXT",
            Self::PreferredStyle => "PREFERRED_STYLE",
            Self::RecommendedExpert => "RECOMMENDED_EXPERT",
            Self::RecommendedFormat => "RECOMMENDED_FORMAT",
            Self::UrgencyLevel => "URGENCY_LEVEL",
            Self::Summary => "SUMMARY",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }
}

impl std::fmt::Display for ClassificationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Field view of a complete record. Values are whatever the model wrote after
/// the label, trimmed; they are not validated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClassificationRecord {
    pub issue_cluster: String,
    pub severity: String,
    pub context: String,
    pub preferred_style: String,
    pub recommended_expert: String,
    pub recommended_format: String,
    pub urgency_level: String,
    pub summary: String,
}

impl ClassificationRecord {
    fn slot_mut(&mut self, field: ClassificationField) -> &mut String {
        match field {
            ClassificationField::IssueCluster => &mut self.issue_cluster,
            ClassificationField::Severity => &mut self.severity,
            ClassificationField::Context => &mut self.context,
            ClassificationField::PreferredStyle => &mut self.preferred_style,
            ClassificationField::RecommendedExpert => &mut self.recommended_expert,
            ClassificationField::RecommendedFormat => &mut self.recommended_format,
            ClassificationField::UrgencyLevel => &mut self.urgency_level,
            ClassificationField::Summary => &mut self.summary,
        }
    }
}

/// Outcome of parsing an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationStatus {
    /// No marker; intake is still in progress.
    None,
    /// Marker present but some labels are missing.
    Partial { missing: Vec<ClassificationField> },
    /// Every label present.
    Complete(ClassificationRecord),
}

impl ClassificationStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// True iff the reply contains the record marker anywhere.
///
/// This is a substring test. A reply that merely quotes the marker counts,
/// and a record whose first label is reformatted does not.
pub fn is_classification(reply: &str) -> bool {
    reply.contains(CLASSIFICATION_MARKER)
}

// Tolerates list bullets, headings and bold markers around a label.
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s>#*\-]*([A-Z][A-Z_]*)\**\s*:\**\s*(.*?)\s*$").expect("valid label regex")
});

/// Parse the labeled fields of a reply.
pub fn parse_classification(reply: &str) -> ClassificationStatus {
    if !is_classification(reply) {
        return ClassificationStatus::None;
    }

    let mut record = ClassificationRecord::default();
    let mut seen: Vec<ClassificationField> = Vec::new();
    let mut current: Option<ClassificationField> = None;

    for line in reply.lines() {
        let labeled = LABEL_LINE.captures(line).and_then(|caps| {
            let field = ClassificationField::from_label(caps.get(1)?.as_str())?;
            Some((field, caps.get(2).map_or("", |m| m.as_str())))
        });

        match labeled {
            Some((field, value)) => {
                *record.slot_mut(field) = value.trim_end_matches('*').trim().to_string();
                if !seen.contains(&field) {
                    seen.push(field);
                }
                current = Some(field);
            }
            None => {
                // Continuation of a multi-line value (typically SUMMARY). A
                // blank line ends the value; text after it is closing chatter.
                let text = line.trim();
                if text.is_empty() {
                    current = None;
                } else if let Some(field) = current {
                    let slot = record.slot_mut(field);
                    if !slot.is_empty() {
                        slot.push(' ');
                    }
                    slot.push_str(text);
                }
            }
        }
    }

    let missing: Vec<ClassificationField> = ClassificationField::ALL
        .into_iter()
        .filter(|f| !seen.contains(f))
        .collect();

    if missing.is_empty() {
        ClassificationStatus::Complete(record)
    } else {
        ClassificationStatus::Partial { missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "Thanks for sharing all of that. Here is your intake summary:\n\n\
ISSUE_CLUSTER: work stress\n\
SEVERITY: medium\n\
CONTEXT: work\n\
PREFERRED_STYLE: practical, structured\n\
RECOMMENDED_EXPERT: workplace stress counselor\n\
RECOMMENDED_FORMAT: video session\n\
URGENCY_LEVEL: moderate\n\
SUMMARY: Two weeks of anxiety tied to workload.\n\
Sleep is starting to suffer.";

    #[test]
    fn marker_mid_text_is_detected() {
        assert!(is_classification("Here you go.\nISSUE_CLUSTER: burnout\nSEVERITY: high"));
    }

    #[test]
    fn plain_question_is_not_detected() {
        assert!(!is_classification("How long have you been feeling this way?"));
    }

    #[test]
    fn echoed_marker_is_a_known_false_positive() {
        let reply = "You wrote \"ISSUE_CLUSTER: test\" — could you tell me more about what's going on?";
        assert!(is_classification(reply));
    }

    #[test]
    fn reformatted_marker_is_a_known_false_negative() {
        assert!(!is_classification("Issue cluster: work stress\nSeverity: medium"));
        assert!(!is_classification("ISSUE_CLUSTER - work stress"));
    }

    #[test]
    fn parse_without_marker_is_none() {
        assert_eq!(
            parse_classification("What would you like help with?"),
            ClassificationStatus::None
        );
    }

    #[test]
    fn parse_full_record() {
        match parse_classification(FULL) {
            ClassificationStatus::Complete(record) => {
                assert_eq!(record.issue_cluster, "work stress");
                assert_eq!(record.severity, "medium");
                assert_eq!(record.context, "work");
                assert_eq!(record.recommended_format, "video session");
                assert_eq!(
                    record.summary,
                    "Two weeks of anxiety tied to workload. Sleep is starting to suffer."
                );
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn closing_remark_after_blank_line_is_not_part_of_summary() {
        let reply = format!("{FULL}\n\nWould you like to book a session?");
        match parse_classification(&reply) {
            ClassificationStatus::Complete(record) => assert_eq!(
                record.summary,
                "Two weeks of anxiety tied to workload. Sleep is starting to suffer."
            ),
            other => panic!("expected Complete, got {other:?}"),
        }

        let short = ClassificationField::ALL
            .iter()
            .filter(|f| **f != ClassificationField::Summary)
            .map(|f| format!("{}: x", f.label()))
            .collect::<Vec<_>>()
            .join("\n")
            + "\nSUMMARY: short.\n\nWould you like to book a session?";
        match parse_classification(&short) {
            ClassificationStatus::Complete(record) => assert_eq!(record.summary, "short."),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn blank_line_does_not_reopen_an_earlier_field() {
        let reply = ClassificationField::ALL
            .iter()
            .map(|f| format!("{}: x", f.label()))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n\nLet me know if anything looks off.\nSEVERITY: high";
        match parse_classification(&reply) {
            ClassificationStatus::Complete(record) => {
                assert_eq!(record.summary, "x");
                assert_eq!(record.severity, "high");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn parse_partial_lists_missing_fields() {
        let reply = "ISSUE_CLUSTER: work stress\nSEVERITY: medium\n...";
        match parse_classification(reply) {
            ClassificationStatus::Partial { missing } => {
                assert_eq!(missing.len(), 6);
                assert_eq!(missing[0], ClassificationField::Context);
                assert!(missing.contains(&ClassificationField::Summary));
            }
            other => panic!("expected Partial, got {other:?}"),
        }
    }

    #[test]
    fn parse_tolerates_markdown_decoration() {
        let reply = "**ISSUE_CLUSTER:** grief\n- **SEVERITY:** high\n- CONTEXT: personal\n\
PREFERRED_STYLE: gentle\nRECOMMENDED_EXPERT: grief counselor\n\
RECOMMENDED_FORMAT: in person\nURGENCY_LEVEL: high\nSUMMARY: Recent loss.";
        match parse_classification(reply) {
            ClassificationStatus::Complete(record) => {
                assert_eq!(record.issue_cluster, "grief");
                assert_eq!(record.severity, "high");
                assert_eq!(record.context, "personal");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn empty_values_still_count_as_present() {
        let reply = ClassificationField::ALL
            .iter()
            .map(|f| format!("{}:", f.label()))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(parse_classification(&reply).is_complete());
    }

    #[test]
    fn labels_round_trip() {
        for field in ClassificationField::ALL {
            assert_eq!(ClassificationField::from_label(field.label()), Some(field));
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.label()));
        }
    }
}
