//! # LLM Integration Module
//!
//! Sends a serialized data table to a hosted language model and brings back
//! a narrative cost-optimization write-up.
//!
//! ## Purpose
//! - Talk to an OpenAI-style chat completion endpoint or a Hugging Face
//!   hosted text-generation endpoint
//! - Ride out the transient states those endpoints report (model still
//!   loading, rate limited) with a bounded number of retries
//! - Hand the UI a plain success/failure result it can render directly
//!
//! ## Sub-modules
//! - `client`: request building, reply classification and the retry loop
//! - `inference_types`: request/response data structures for the providers
//! - `prompt`: the analysis prompt template
//! - `retry`: retry policy and cancellation
//!
//! ## Usage
//! Build an [`InferenceClient`] from the settings, wrap the table in an
//! [`AnalysisPrompt`] and call [`Analyst::analyze`] off the UI thread. A
//! [`CancelToken`] stops a long retry sequence between attempts.

mod client;
mod inference_types;
mod prompt;
mod retry;

use std::sync::Arc;

pub use client::*;
pub use prompt::*;
pub use retry::*;

use crate::http::Transport;
use crate::types::AnalysisResult;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_HF_URL: &str =
    "https://api-inference.huggingface.co/models/meta-llama/Llama-3.2-11B-Vision-Instruct";

/// Anything that can turn a prompt into a narrative.
pub trait Analyst: Send + Sync {
    fn analyze(&self, prompt: &str, cancel: &CancelToken) -> AnalysisResult;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    OpenAiChat {
        url: String,
        model: String,
        temperature: f64,
    },
    HuggingFace {
        url: String,
    },
}

impl Provider {
    pub fn openai() -> Self {
        Provider::OpenAiChat {
            url: DEFAULT_OPENAI_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.7,
        }
    }

    pub fn hugging_face() -> Self {
        Provider::HuggingFace {
            url: DEFAULT_HF_URL.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Provider::OpenAiChat { url, .. } | Provider::HuggingFace { url } => url,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAiChat { .. } => "OpenAI",
            Provider::HuggingFace { .. } => "Hugging Face",
        }
    }
}

#[derive(Clone)]
pub struct InferenceClient {
    pub provider: Provider,
    pub token: Option<String>,
    pub retry: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl InferenceClient {
    pub fn new(provider: Provider, token: Option<String>, transport: Arc<dyn Transport>) -> Self {
        InferenceClient {
            provider,
            token,
            retry: RetryPolicy::default(),
            transport,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
