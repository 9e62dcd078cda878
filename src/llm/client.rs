use backoff::backoff::Backoff;
use bevy::log;

use super::inference_types::{ChatRequest, GenerationRequest, Message, ReplyEnvelope, Role};
use super::{Analyst, CancelToken, InferenceClient, Provider, SYSTEM_PROMPT, wait_or_cancel};
use crate::http::HttpReply;
use crate::types::AnalysisResult;

pub const LOADING_EXHAUSTED: &str = "Model could not be loaded after multiple attempts.";
pub const RATE_LIMIT_EXHAUSTED: &str = "Rate limit persisted after multiple attempts.";
pub const CANCELLED: &str = "Analysis cancelled.";

/// How one answer from the inference endpoint should be treated.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    /// The model is still being loaded on the provider's side.
    Loading,
    RateLimited,
    /// Anything not worth retrying.
    Failed(String),
}

pub fn classify(reply: &HttpReply) -> Reply {
    let envelope = serde_json::from_str::<ReplyEnvelope>(&reply.body);

    match envelope {
        Ok(ReplyEnvelope::Error { error }) => {
            let message = error.message();
            if message.contains("currently loading") {
                Reply::Loading
            } else if reply.status == 429 || message.contains("Rate limit") {
                Reply::RateLimited
            } else {
                Reply::Failed(message.to_string())
            }
        }
        _ if reply.status == 429 => Reply::RateLimited,
        Ok(envelope) if reply.is_success() => match envelope.text() {
            Some(text) => Reply::Text(text),
            None => Reply::Failed("The model returned no text.".to_string()),
        },
        Ok(_) => Reply::Failed(format!("Inference endpoint answered HTTP {}.", reply.status)),
        Err(_) => Reply::Failed(format!(
            "Unrecognised response from inference endpoint (HTTP {}).",
            reply.status
        )),
    }
}

#[derive(Clone, Copy)]
enum Transient {
    Loading,
    RateLimited,
}

impl InferenceClient {
    pub fn request_body(&self, prompt: &str) -> serde_json::Value {
        let body = match &self.provider {
            Provider::OpenAiChat {
                model, temperature, ..
            } => serde_json::to_value(ChatRequest {
                model: model.clone(),
                messages: vec![
                    Message {
                        role: Role::System,
                        content: SYSTEM_PROMPT.to_string(),
                    },
                    Message {
                        role: Role::User,
                        content: prompt.to_string(),
                    },
                ],
                temperature: *temperature,
            }),
            Provider::HuggingFace { .. } => serde_json::to_value(GenerationRequest {
                inputs: prompt.to_string(),
            }),
        };
        // Plain strings and numbers; serializing them cannot fail.
        body.unwrap_or_default()
    }

    fn send(&self, body: &serde_json::Value) -> Reply {
        match self
            .transport
            .post_json(self.provider.url(), self.token.as_deref(), body)
        {
            Ok(reply) => {
                log::debug!("{} answered HTTP {}", self.provider.name(), reply.status);
                classify(&reply)
            }
            Err(e) => Reply::Failed(format!("Could not reach the analysis service: {e}")),
        }
    }
}

impl Analyst for InferenceClient {
    fn analyze(&self, prompt: &str, cancel: &CancelToken) -> AnalysisResult {
        let body = self.request_body(prompt);
        let attempts = self.retry.attempts();
        let mut last = Transient::Loading;
        let mut rate_limit = self.retry.rate_limit_backoff();

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return AnalysisResult::failed(CANCELLED);
            }
            log::info!(
                "Sending analysis to {} (attempt {attempt}/{attempts})",
                self.provider.name()
            );

            let wait = match self.send(&body) {
                Reply::Text(text) => return AnalysisResult::Narrative(text),
                Reply::Failed(message) => {
                    log::warn!("Analysis failed: {message}");
                    return AnalysisResult::Failed(message);
                }
                Reply::Loading => {
                    last = Transient::Loading;
                    self.retry.loading_interval
                }
                Reply::RateLimited => {
                    last = Transient::RateLimited;
                    rate_limit
                        .next_backoff()
                        .unwrap_or(self.retry.rate_limit_max)
                }
            };

            if attempt < attempts {
                log::info!("{} not ready, retrying in {:?}", self.provider.name(), wait);
                if !wait_or_cancel(wait, cancel) {
                    return AnalysisResult::failed(CANCELLED);
                }
            }
        }

        match last {
            Transient::Loading => AnalysisResult::failed(LOADING_EXHAUSTED),
            Transient::RateLimited => AnalysisResult::failed(RATE_LIMIT_EXHAUSTED),
        }
    }
}
