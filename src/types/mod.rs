//! Shared request types, independent of any backend wire format.

pub mod config;
pub mod message;

pub use config::GenerationConfig;
pub use message::{ChatMessage, Role};
