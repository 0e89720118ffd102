use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message of the transcript. Never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::User,
            content: s.into(),
            timestamp: Utc::now(),
        }
    }
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::Assistant,
            content: s.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A backend model the user can pick. Identity is `id`; `name` is advisory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Model {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn bare<I: Into<String>>(id: I) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Short display label: "Gemini " prefix dropped, "(Experimental)"
    /// shortened, and a sparkle for 2.0+ models.
    pub fn label(&self) -> String {
        let raw = self.name.as_deref().unwrap_or(&self.id);
        let shown = raw
            .replacen("Gemini ", "", 1)
            .replace(" (Experimental)", " (exp)");
        match crate::select::extract_version(raw) {
            Some(v) if v >= crate::select::Version::V2 => format!("{} \u{2728}", shown),
            _ => shown,
        }
    }
}

/// Result of asking the provider for its live model list. `warning` is set
/// whenever the list could not be obtained; `models` is then empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateFetch {
    pub models: Vec<Model>,
    pub warning: Option<String>,
}

impl CandidateFetch {
    pub fn failed<S: Into<String>>(warning: S) -> Self {
        Self {
            models: Vec::new(),
            warning: Some(warning.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BlockThreshold {
    #[serde(rename = "BLOCK_MEDIUM_AND_ABOVE")]
    MediumAndAbove,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: BlockThreshold::MediumAndAbove,
    })
    .collect()
}

#[derive(Clone, Debug)]
pub struct ChatOpts {
    pub model: String,
    pub system_instruction: String,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl ChatOpts {
    pub fn new<M: Into<String>, S: Into<String>>(model: M, system_instruction: S) -> Self {
        Self {
            model: model.into(),
            system_instruction: system_instruction.into(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API key is not configured")] MissingApiKey,
    #[error("auth error: {0}")] Auth(String),
    #[error("rate limit: {0}")] RateLimit(String),
    #[error("network: {0}")] Network(String),
    #[error("decode: {0}")] Decode(String),
    #[error("protocol: {0}")] Protocol(String),
    #[error("other: {0}")] Other(String),
}

pub const MISSING_KEY_MESSAGE: &str = "API Key is missing. Please configure it in your environment variables. Get it from https://aistudio.google.com/u/1/apikey";
pub const INVALID_KEY_MESSAGE: &str = "API Key is invalid. Please check your configuration.";
pub const QUOTA_MESSAGE: &str = "API quota exceeded. Please check your usage or billing.";

/// Turn a provider failure into the text shown as the assistant's reply.
pub fn describe_failure(err: &ChatError) -> String {
    if matches!(err, ChatError::MissingApiKey) {
        return MISSING_KEY_MESSAGE.to_string();
    }
    let text = err.to_string();
    if text.contains("API key not valid") {
        INVALID_KEY_MESSAGE.to_string()
    } else if text.contains("quota") {
        QUOTA_MESSAGE.to_string()
    } else {
        format!("An error occurred while contacting the AI model: {}", text)
    }
}

#[allow(async_fn_in_trait)]
pub trait ModelClient: Send + Sync {
    /// Single-turn exchange: no history, one prompt, one reply.
    async fn send_chat(&self, prompt: &str, opts: &ChatOpts) -> Result<String, ChatError>;

    /// Live candidate list. Must not fail; problems are reported via
    /// `CandidateFetch::warning`.
    async fn fetch_candidates(&self) -> CandidateFetch;

    /// Send `prompt` and always come back with displayable text.
    async fn run(&self, prompt: &str, model_id: &str, system_instruction: &str) -> String {
        let opts = ChatOpts::new(model_id, system_instruction);
        match self.send_chat(prompt, &opts).await {
            Ok(text) => text,
            Err(ChatError::MissingApiKey) => {
                warn!(target: "core::llm", "chat skipped: no API key configured");
                MISSING_KEY_MESSAGE.to_string()
            }
            Err(e) => {
                error!(target: "core::llm", "chat failed model={} err={}", model_id, e);
                describe_failure(&e)
            }
        }
    }
}
