//! Mock booking flow over a fixed list of slots.
//!
//! Nothing here talks to a calendar. Confirming a slot just records it on the
//! session and hands back the acknowledgement text.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::BookingError;

/// The slots offered to every session.
pub static SLOTS: [&str; 4] = [
    "Tomorrow — 10:00 AM",
    "Tomorrow — 2:30 PM",
    "Friday — 11:00 AM",
    "Friday — 4:00 PM",
];

/// Shown alongside every confirmation.
pub const EXPERT_NOTE: &str = "A confirmation summary has been generated for the expert.";

/// Progresses linearly: NotStarted → Started → Confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BookingPhase {
    #[default]
    NotStarted,
    Started { selected: Option<String> },
    Confirmed { slot: String },
}

impl BookingPhase {
    fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Started { .. } => "started",
            Self::Confirmed { .. } => "confirmed",
        }
    }
}

impl std::fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Acknowledgement returned by a successful confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConfirmation {
    pub slot: String,
    pub message: String,
    pub note: String,
    pub confirmed_at: DateTime<Utc>,
}

/// Per-session booking state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Booking {
    phase: BookingPhase,
}

impl Booking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &BookingPhase {
        &self.phase
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.phase, BookingPhase::NotStarted)
    }

    pub fn selected_slot(&self) -> Option<&str> {
        match &self.phase {
            BookingPhase::Started { selected } => selected.as_deref(),
            BookingPhase::Confirmed { slot } => Some(slot),
            BookingPhase::NotStarted => None,
        }
    }

    pub fn booked_slot(&self) -> Option<&str> {
        match &self.phase {
            BookingPhase::Confirmed { slot } => Some(slot),
            _ => None,
        }
    }

    /// NotStarted → Started. Requires a classification; starting an already
    /// started booking changes nothing.
    pub fn start(&mut self, has_classification: bool) -> Result<(), BookingError> {
        match &self.phase {
            BookingPhase::Confirmed { slot } => {
                return Err(BookingError::AlreadyConfirmed { slot: slot.clone() });
            }
            BookingPhase::Started { .. } => return Ok(()),
            BookingPhase::NotStarted => {}
        }
        if !has_classification {
            return Err(BookingError::NoClassification);
        }
        self.phase = BookingPhase::Started { selected: None };
        tracing::info!("Booking started");
        Ok(())
    }

    /// Pick (or re-pick) one of [`SLOTS`] while booking is started.
    pub fn select(&mut self, slot: &str) -> Result<(), BookingError> {
        let chosen = SLOTS
            .iter()
            .find(|s| **s == slot.trim())
            .ok_or_else(|| BookingError::UnknownSlot(slot.to_string()))?;
        match &mut self.phase {
            BookingPhase::NotStarted => Err(BookingError::NotStarted),
            BookingPhase::Confirmed { slot } => Err(BookingError::AlreadyConfirmed {
                slot: slot.clone(),
            }),
            BookingPhase::Started { selected } => {
                *selected = Some(chosen.to_string());
                Ok(())
            }
        }
    }

    /// Started (with a selection) → Confirmed.
    pub fn confirm(&mut self) -> Result<BookingConfirmation, BookingError> {
        let slot = match &self.phase {
            BookingPhase::NotStarted => return Err(BookingError::NotStarted),
            BookingPhase::Confirmed { slot } => {
                return Err(BookingError::AlreadyConfirmed { slot: slot.clone() });
            }
            BookingPhase::Started { selected: None } => return Err(BookingError::NoSlotSelected),
            BookingPhase::Started {
                selected: Some(slot),
            } => slot.clone(),
        };

        self.phase = BookingPhase::Confirmed { slot: slot.clone() };
        tracing::info!(slot = %slot, "Booking confirmed");

        Ok(BookingConfirmation {
            message: format!("Session booked for {slot}"),
            note: EXPERT_NOTE.to_string(),
            slot,
            confirmed_at: Utc::now(),
        })
    }
}
