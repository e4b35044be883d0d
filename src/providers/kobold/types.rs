//! Wire types for the KoboldCPP generation API.

use crate::types::GenerationConfig;
use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v1/generate` (snake_case keys on the wire).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub max_context_length: u32,
    pub max_length: u32,
    pub prompt: String,
    pub quiet: bool,
    pub rep_pen: f64,
    pub rep_pen_range: u32,
    pub rep_pen_slope: f64,
    pub temperature: f64,
    pub tfs: u32,
    pub top_a: f64,
    pub top_k: f64,
    pub top_p: f64,
    pub min_p: f64,
    pub typical: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    pub stop_sequence: Vec<String>,
    pub trim_stop: bool,
    pub sampler_order: Vec<u32>,
}

impl GenerateRequest {
    /// Render a shared config into the raw-prompt generation shape.
    ///
    /// The caller's prompt is sent verbatim. System template and character
    /// context are concatenated into the `memory` field in fixed order
    /// (template, description, personality, scenario), with any
    /// caller-supplied memory appended last; when none of those are present
    /// the field is omitted.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let mut memory = config.context_parts().concat();
        if let Some(explicit) = &config.memory {
            memory.push_str(explicit);
        }

        Self {
            max_context_length: config.max_context_length,
            max_length: config.max_length,
            prompt: config.prompt.clone().unwrap_or_default(),
            quiet: false,
            rep_pen: config.rep_pen,
            rep_pen_range: config.rep_pen_range,
            rep_pen_slope: config.rep_pen_slope,
            temperature: config.temperature,
            tfs: config.tfs,
            top_a: config.top_a,
            top_k: config.top_k,
            top_p: config.top_p,
            min_p: config.min_p,
            typical: config.typical,
            memory: (!memory.is_empty()).then_some(memory),
            stop_sequence: config.stop_sequences.clone(),
            trim_stop: config.trim_stop,
            sampler_order: config.sampler_order.clone(),
        }
    }
}

/// Response body for `POST /api/v1/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub results: Vec<GenerationResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

/// One streamed chunk from `/api/extra/generate/stream`. There is no
/// end-of-stream sentinel; `finish_reason` inside a chunk signals completion.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Envelope for scalar string endpoints (`{"result": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEnvelope {
    pub result: String,
}

/// Envelope for scalar integer endpoints (`{"value": n}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ValueEnvelope {
    pub value: i64,
}

/// Request body for `POST /api/extra/tokencount`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCountRequest {
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_from_template_and_character_fields() {
        let config = GenerationConfig::for_prompt("User: hi\nBot:")
            .with_template("T.")
            .with_character(
                Some("D.".to_string()),
                Some("P.".to_string()),
                Some("S.".to_string()),
            );
        let request = GenerateRequest::from_config(&config);
        assert_eq!(request.memory.as_deref(), Some("T.D.P.S."));
        assert_eq!(request.prompt, "User: hi\nBot:");
    }

    #[test]
    fn test_caller_memory_appended_last() {
        let config = GenerationConfig::for_prompt("p")
            .with_template("T.")
            .with_memory("M.");
        let request = GenerateRequest::from_config(&config);
        assert_eq!(request.memory.as_deref(), Some("T.M."));
    }

    #[test]
    fn test_memory_absent_without_context() {
        let config = GenerationConfig::for_prompt("p");
        let request = GenerateRequest::from_config(&config);
        assert!(request.memory.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("memory").is_none());
    }

    #[test]
    fn test_sampling_parameters_survive_snake_case_round_trip() {
        let mut config = GenerationConfig::for_prompt("p");
        config.temperature = 0.66;
        config.top_p = 0.91;
        config.top_k = 42.0;
        config.top_a = 0.33;
        config.min_p = 0.05;
        config.typical = 3;
        config.tfs = 2;
        config.rep_pen = 1.11;
        config.rep_pen_range = 512;
        config.rep_pen_slope = 0.9;
        config.max_length = 128;
        config.max_context_length = 8192;

        let body = serde_json::to_string(&GenerateRequest::from_config(&config)).unwrap();
        let decoded: GenerateRequest = serde_json::from_str(&body).unwrap();

        assert_eq!(decoded.temperature, config.temperature);
        assert_eq!(decoded.top_p, config.top_p);
        assert_eq!(decoded.top_k, config.top_k);
        assert_eq!(decoded.top_a, config.top_a);
        assert_eq!(decoded.min_p, config.min_p);
        assert_eq!(decoded.typical, config.typical);
        assert_eq!(decoded.tfs, config.tfs);
        assert_eq!(decoded.rep_pen, config.rep_pen);
        assert_eq!(decoded.rep_pen_range, config.rep_pen_range);
        assert_eq!(decoded.rep_pen_slope, config.rep_pen_slope);
        assert_eq!(decoded.max_length, config.max_length);
        assert_eq!(decoded.max_context_length, config.max_context_length);

        // Confirm the wire key spelling directly.
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        for key in [
            "max_context_length",
            "max_length",
            "rep_pen",
            "rep_pen_range",
            "rep_pen_slope",
            "top_a",
            "top_k",
            "top_p",
            "min_p",
            "stop_sequence",
            "trim_stop",
            "sampler_order",
        ] {
            assert!(value.get(key).is_some(), "missing wire key {key}");
        }
    }
}
