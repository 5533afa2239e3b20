//! Per-session intake state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::classification::ClassificationRecord;
use super::prompts::GREETING;
use super::transcript::Transcript;
use crate::booking::{Booking, BookingConfirmation, SLOTS};
use crate::error::BookingError;

/// State of one intake conversation. Owned by exactly one session; nothing in
/// here is shared across sessions.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    pub id: Uuid,
    transcript: Transcript,
    final_classification: Option<String>,
    record: Option<ClassificationRecord>,
    booking: Booking,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    /// A fresh session whose transcript holds only the greeting.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transcript: Transcript::with_greeting(GREETING),
            final_classification: None,
            record: None,
            booking: Booking::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn final_classification(&self) -> Option<&str> {
        self.final_classification.as_deref()
    }

    /// Parsed fields of the final classification, when it was complete.
    pub fn classification_record(&self) -> Option<&ClassificationRecord> {
        self.record.as_ref()
    }

    pub fn has_classification(&self) -> bool {
        self.final_classification.is_some()
    }

    /// Record a detected classification. The latest detection replaces any
    /// earlier one.
    pub(crate) fn set_classification(&mut self, text: String, record: Option<ClassificationRecord>) {
        self.final_classification = Some(text);
        self.record = record;
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn booking_started(&self) -> bool {
        self.booking.is_started()
    }

    pub fn booked_slot(&self) -> Option<&str> {
        self.booking.booked_slot()
    }

    pub fn start_booking(&mut self) -> Result<(), BookingError> {
        let has_classification = self.has_classification();
        self.booking.start(has_classification)?;
        self.touch();
        Ok(())
    }

    pub fn select_slot(&mut self, slot: &str) -> Result<(), BookingError> {
        self.booking.select(slot)?;
        self.touch();
        Ok(())
    }

    pub fn confirm_booking(&mut self) -> Result<BookingConfirmation, BookingError> {
        let confirmation = self.booking.confirm()?;
        self.touch();
        Ok(confirmation)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Actions the user surface should offer right now.
    pub fn actions(&self) -> SessionActions {
        let classified = self.has_classification();
        SessionActions {
            download_summary: classified,
            start_booking: classified && !self.booking.is_started(),
            select_slot: self.booking.is_started() && self.booked_slot().is_none(),
            confirm_booking: self.booking.selected_slot().is_some() && self.booked_slot().is_none(),
        }
    }

    /// Snapshot for the HTTP surface.
    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            messages: self.transcript.clone(),
            final_classification: self.final_classification.clone(),
            classification: self.record.clone(),
            booking_started: self.booking_started(),
            booked_slot: self.booked_slot().map(String::from),
            booking: self.booking.clone(),
            slots: if self.booking_started() {
                SLOTS.iter().map(|s| s.to_string()).collect()
            } else {
                Vec::new()
            },
            actions: self.actions(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Which post-classification actions are currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionActions {
    pub download_summary: bool,
    pub start_booking: bool,
    pub select_slot: bool,
    pub confirm_booking: bool,
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub messages: Transcript,
    pub final_classification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationRecord>,
    pub booking_started: bool,
    pub booked_slot: Option<String>,
    pub booking: Booking,
    pub slots: Vec<String>,
    pub actions: SessionActions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_greeting_and_no_flags() {
        let session = IntakeSession::new();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().messages()[0].content, GREETING);
        assert!(session.final_classification().is_none());
        assert!(!session.booking_started());
        assert!(session.booked_slot().is_none());
    }

    #[test]
    fn no_actions_before_classification() {
        let session = IntakeSession::new();
        let actions = session.actions();
        assert!(!actions.download_summary);
        assert!(!actions.start_booking);
        assert!(!actions.select_slot);
        assert!(!actions.confirm_booking);
    }

    #[test]
    fn booking_blocked_until_classified() {
        let mut session = IntakeSession::new();
        assert_eq!(session.start_booking(), Err(BookingError::NoClassification));

        session.set_classification("ISSUE_CLUSTER: work stress".to_string(), None);
        assert!(session.actions().download_summary);
        assert!(session.actions().start_booking);

        session.start_booking().unwrap();
        assert!(session.booking_started());
        assert!(!session.actions().start_booking);
        assert!(session.actions().select_slot);
        assert!(!session.actions().confirm_booking);

        session.select_slot(SLOTS[2]).unwrap();
        assert!(session.actions().confirm_booking);

        let confirmation = session.confirm_booking().unwrap();
        assert_eq!(session.booked_slot(), Some(confirmation.slot.as_str()));
        assert!(!session.actions().select_slot);
        assert!(!session.actions().confirm_booking);
    }

    #[test]
    fn view_exposes_slots_only_after_start() {
        let mut session = IntakeSession::new();
        session.set_classification("ISSUE_CLUSTER: x".to_string(), None);
        assert!(session.view().slots.is_empty());
        session.start_booking().unwrap();
        assert_eq!(session.view().slots.len(), 4);
    }

    #[test]
    fn view_serializes_messages_in_order() {
        let session = IntakeSession::new();
        let json = serde_json::to_value(session.view()).unwrap();
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert_eq!(json["final_classification"], serde_json::Value::Null);
        assert_eq!(json["booking"]["phase"], "not_started");
        assert!(json.get("classification").is_none());
    }
}
