//! Wire types for the OpenRouter chat-completion API.

use crate::types::GenerationConfig;
use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: f64,
    pub top_a: f64,
    pub min_p: f64,
    pub max_tokens: u32,
    pub repetition_penalty: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    pub reasoning: Reasoning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Reasoning-token control. Excluded from responses by default, matching the
/// chat-style use this client targets.
#[derive(Debug, Clone, Serialize)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
    pub exclude: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ChatCompletionRequest {
    /// Render a shared config into the chat-completion shape.
    ///
    /// Character context becomes up to four synthesized system messages in
    /// fixed order (template, description, personality, scenario), prepended
    /// ahead of the caller's messages.
    pub fn from_config(config: &GenerationConfig, stream: bool) -> Self {
        let mut messages: Vec<WireMessage> = config
            .context_parts()
            .into_iter()
            .map(|part| WireMessage {
                role: "system".to_string(),
                content: part.to_string(),
            })
            .collect();
        messages.extend(config.messages.iter().map(|msg| WireMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }));

        Self {
            model: config.model.clone(),
            messages,
            stop: config.stop_sequences.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            top_a: config.top_a,
            min_p: config.min_p,
            max_tokens: config.max_length,
            repetition_penalty: config.rep_pen,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            stream: stream.then_some(true),
            reasoning: Reasoning {
                effort: ReasoningEffort::Medium,
                exclude: true,
            },
        }
    }
}

/// Full response body for a non-streamed `POST /chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub native_finish_reason: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// One streamed chunk: `choices[0].delta` carries the content delta.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<Delta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Envelope for `GET /key`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyEnvelope {
    #[serde(default)]
    pub data: Option<KeyInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyInfo {
    pub label: String,
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub is_free_tier: Option<bool>,
    #[serde(default)]
    pub is_provisioning_key: Option<bool>,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub limit_remaining: Option<f64>,
}

/// Envelope for `GET /models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub architecture: Option<ModelArchitecture>,
    #[serde(default)]
    pub top_provider: Option<TopProvider>,
    #[serde(default)]
    pub pricing: Option<ModelPricing>,
    #[serde(default)]
    pub context_length: Option<f64>,
    #[serde(default)]
    pub per_request_limits: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArchitecture {
    #[serde(default)]
    pub input_modalities: Vec<String>,
    #[serde(default)]
    pub output_modalities: Vec<String>,
    #[serde(default)]
    pub tokenizer: Option<String>,
    #[serde(default)]
    pub instruct_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopProvider {
    #[serde(default)]
    pub is_moderated: Option<bool>,
    #[serde(default)]
    pub context_length: Option<f64>,
    #[serde(default)]
    pub max_completion_tokens: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelPricing {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub completion: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}
