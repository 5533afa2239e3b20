//! Wellness intake: conversational intake, classification, summary export
//! and mock booking.

pub mod booking;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod routes;
pub mod sessions;
pub mod summary;
