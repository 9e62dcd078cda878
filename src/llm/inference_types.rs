use serde::{Deserialize, Serialize};

// https://platform.openai.com/docs/api-reference/chat
// https://huggingface.co/docs/api-inference/detailed_parameters

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    System,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Body for a hosted text-generation model.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub inputs: String,
}

/// Every reply shape the supported providers send back.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReplyEnvelope {
    Error { error: ErrorBody },
    Choices { choices: Vec<Choice> },
    GeneratedList(Vec<Generated>),
    Generated(Generated),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

impl ErrorBody {
    pub fn message(&self) -> &str {
        match self {
            ErrorBody::Text(s) => s,
            ErrorBody::Object { message: Some(m) } => m,
            ErrorBody::Object { message: None } => "Unknown error",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    /// Chat-completion style.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    /// Completion style.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Generated {
    pub generated_text: String,
}

impl ReplyEnvelope {
    /// Generated text, when the envelope carries any.
    pub fn text(self) -> Option<String> {
        match self {
            ReplyEnvelope::Error { .. } => None,
            ReplyEnvelope::Choices { choices } => {
                let first = choices.into_iter().next()?;
                first.message.and_then(|m| m.content).or(first.text)
            }
            ReplyEnvelope::GeneratedList(list) => list.into_iter().next().map(|g| g.generated_text),
            ReplyEnvelope::Generated(g) => Some(g.generated_text),
        }
    }
}
