//! Bridge from rig's `CompletionModel` to our `LlmProvider` trait.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

/// Groq's rate-limit message ends with e.g. "Please try again in 7.66s".
static RETRY_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in (\d+(?:\.\d+)?)s").expect("retry hint pattern is valid")
});

/// Wraps any rig completion model as an `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

/// Chat transcript split the way rig expects it: system text as the
/// preamble, the final message as the prompt, everything else as history.
struct RigParts {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: Message,
}

fn to_rig_parts(messages: &[ChatMessage]) -> Option<RigParts> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

    let mut turns: Vec<Message> = messages
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
        })
        .collect();
    let prompt = turns.pop()?;

    Some(RigParts {
        preamble,
        history: turns,
        prompt,
    })
}

/// Map a rig failure onto our error kinds. rig reports provider errors as
/// text, so the classification is keyed on the status wording and error codes
/// the OpenAI-compatible APIs put in their bodies.
fn classify_error(provider: &str, error: &CompletionError) -> LlmError {
    let reason = error.to_string();
    let lower = reason.to_lowercase();

    if lower.contains("rate_limit")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
    {
        return LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: retry_hint(&reason),
        };
    }
    if lower.contains("invalid_api_key")
        || lower.contains("invalid api key")
        || lower.contains("unauthorized")
    {
        return LlmError::AuthFailed {
            provider: provider.to_string(),
        };
    }
    match error {
        CompletionError::JsonError(_) | CompletionError::ResponseError(_) => {
            LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason,
            }
        }
        _ => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        },
    }
}

fn retry_hint(message: &str) -> Option<Duration> {
    let secs: f64 = RETRY_HINT.captures(message)?.get(1)?.as_str().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let parts = to_rig_parts(&request.messages).ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "request has no user or assistant messages".to_string(),
        })?;

        tracing::debug!(
            model = %self.model_name,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self
            .model
            .completion_request(parts.prompt)
            .messages(parts.history);
        if let Some(preamble) = parts.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(self.provider, &e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response contained no text".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
        })
    }
}
