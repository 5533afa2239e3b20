//! Intake conversation. The question-and-answer phase that ends when the
//! model emits a classification record.
//!
//! The controller owns no session state. Each call receives the session it
//! should advance, so any number of sessions can share one controller.

pub mod classification;
pub mod controller;
pub mod prompts;
pub mod session;
pub mod transcript;

pub use classification::{
    CLASSIFICATION_MARKER, ClassificationField, ClassificationRecord, ClassificationStatus,
    is_classification, parse_classification,
};
pub use controller::{IntakeController, TurnOutcome};
pub use prompts::{GREETING, IntakeInstructions, OutputField};
pub use session::{IntakeSession, SessionActions, SessionView};
pub use transcript::Transcript;
