//! Turn-taking for the intake conversation.

use std::sync::Arc;

use crate::config::{DEFAULT_TEMPERATURE, DetectionPolicy};
use crate::error::{ConfigError, IntakeError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::classification::{ClassificationStatus, parse_classification};
use super::prompts::IntakeInstructions;
use super::session::IntakeSession;

/// Result of one successful user turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant reply, exactly as the model returned it.
    pub reply: String,
    /// How the detector read the reply.
    pub status: ClassificationStatus,
    /// Whether this reply became the session's final classification.
    pub classified: bool,
}

/// Drives one session's conversation against the model.
pub struct IntakeController {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
    temperature: f32,
    detection: DetectionPolicy,
}

impl IntakeController {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: IntakeInstructions::default().system_prompt(),
            temperature: DEFAULT_TEMPERATURE,
            detection: DetectionPolicy::default(),
        }
    }

    /// Replace the default instructions. Rejected if the resulting record
    /// could not be detected.
    pub fn with_instructions(
        mut self,
        instructions: &IntakeInstructions,
    ) -> Result<Self, ConfigError> {
        instructions.validate()?;
        self.system_prompt = instructions.system_prompt();
        Ok(self)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_detection(mut self, detection: DetectionPolicy) -> Self {
        self.detection = detection;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Run one user turn.
    ///
    /// Appends the user message, sends the system prompt plus the whole
    /// transcript to the model, appends the reply and runs detection. If the
    /// model call fails the user message is removed again, so the session is
    /// exactly as it was before the call and a retry does not duplicate input.
    pub async fn handle_user_turn(
        &self,
        session: &mut IntakeSession,
        user_text: &str,
    ) -> Result<TurnOutcome, IntakeError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(IntakeError::EmptyInput);
        }

        let checkpoint = session.transcript().len();
        session.transcript_mut().push_user(user_text);

        let mut messages = Vec::with_capacity(session.transcript().len() + 1);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(session.transcript().messages().iter().cloned());

        let request = CompletionRequest::new(messages).with_temperature(self.temperature);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                session.transcript_mut().rollback_to(checkpoint);
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "Model call failed, user message rolled back"
                );
                return Err(IntakeError::Model(e));
            }
        };

        let reply = response.content;
        session.transcript_mut().push_assistant(reply.clone());
        session.touch();

        let status = parse_classification(&reply);
        let classified = match (&status, self.detection) {
            (ClassificationStatus::Complete(record), _) => {
                session.set_classification(reply.clone(), Some(record.clone()));
                true
            }
            (ClassificationStatus::Partial { .. }, DetectionPolicy::Marker) => {
                session.set_classification(reply.clone(), None);
                true
            }
            (ClassificationStatus::Partial { missing }, DetectionPolicy::Strict) => {
                tracing::info!(
                    session_id = %session.id,
                    missing = missing.len(),
                    "Incomplete classification record ignored"
                );
                false
            }
            (ClassificationStatus::None, _) => false,
        };

        tracing::info!(
            session_id = %session.id,
            turn = session.transcript().user_turns(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            reply_len = reply.len(),
            classified,
            "Intake turn complete"
        );

        Ok(TurnOutcome {
            reply,
            status,
            classified,
        })
    }
}
