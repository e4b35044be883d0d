use super::message::{ChatMessage, Role};

/// Shared generation parameters for both backends.
///
/// A config is built once per call and handed to an adapter as a read-only
/// snapshot; the adapter decides which of `messages` or `prompt` is
/// authoritative for its backend. Numeric ranges are not validated
/// client-side — out-of-range values surface as server errors.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier (cloud backend only; the local server serves one model).
    pub model: String,
    /// Ordered conversation messages (cloud backend).
    pub messages: Vec<ChatMessage>,
    /// Pre-templated raw prompt (local backend).
    pub prompt: Option<String>,
    /// Caller-supplied memory block (local backend).
    pub memory: Option<String>,
    /// System prompt template, synthesized ahead of character context.
    pub prompt_template: Option<String>,
    pub character_description: Option<String>,
    pub character_personality: Option<String>,
    pub character_scenario: Option<String>,

    // Sampling parameters, passed through unchanged.
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: f64,
    pub top_a: f64,
    pub min_p: f64,
    pub typical: u32,
    pub tfs: u32,
    pub rep_pen: f64,
    pub rep_pen_range: u32,
    pub rep_pen_slope: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,

    pub stop_sequences: Vec<String>,
    pub max_length: u32,
    pub max_context_length: u32,
    pub trim_stop: bool,
    pub sampler_order: Vec<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_string(),
            messages: Vec::new(),
            prompt: None,
            memory: None,
            prompt_template: None,
            character_description: None,
            character_personality: None,
            character_scenario: None,
            temperature: 0.75,
            top_p: 0.92,
            top_k: 100.0,
            top_a: 0.92,
            min_p: 0.0,
            typical: 1,
            tfs: 1,
            rep_pen: 1.07,
            rep_pen_range: 360,
            rep_pen_slope: 0.7,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: vec!["\nUser:".to_string(), "\nAssistant:".to_string()],
            max_length: 240,
            max_context_length: 4096,
            trim_stop: true,
            sampler_order: vec![6, 0, 1, 3, 4, 2, 5],
        }
    }
}

impl GenerationConfig {
    /// Create a config targeting a cloud model with a message list.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Create a config around a raw pre-templated prompt for the local backend.
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Append a message to the conversation.
    pub fn with_message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(role, content));
        self
    }

    /// Append multiple messages to the conversation.
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Set the system prompt template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Set the caller-supplied memory block (local backend).
    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    /// Set the character context fields, synthesized by the adapters.
    pub fn with_character(
        mut self,
        description: Option<String>,
        personality: Option<String>,
        scenario: Option<String>,
    ) -> Self {
        self.character_description = description;
        self.character_personality = personality;
        self.character_scenario = scenario;
        self
    }

    /// Set the stop sequences.
    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = stop;
        self
    }

    /// Set the maximum output length in tokens.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the maximum context window in tokens.
    pub fn with_max_context_length(mut self, max_context_length: u32) -> Self {
        self.max_context_length = max_context_length;
        self
    }

    /// The character-context strings that are present, in their fixed
    /// synthesis order: template, description, personality, scenario.
    pub(crate) fn context_parts(&self) -> Vec<&str> {
        [
            self.prompt_template.as_deref(),
            self.character_description.as_deref(),
            self.character_personality.as_deref(),
            self.character_scenario.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect()
    }
}
