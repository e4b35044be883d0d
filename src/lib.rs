//! A unified client for two incompatible text-generation backends.
//!
//! One shared [`GenerationConfig`] is rendered into either the OpenRouter
//! chat-completion wire format or the KoboldCPP raw-prompt format, and both
//! backends' streamed event grammars are reduced into one
//! [`UnifiedResponse`] sequence with consistent accumulation and termination
//! semantics.

pub mod client;
pub mod error;
mod http;
pub mod import;
pub mod line_stream;
pub mod provider;
pub mod providers;
pub mod response;
mod session;
pub mod types;

// Re-export core types for easy usage
pub use client::{Backend, Client, ClientConfig};
pub use error::Error;
pub use import::{CharacterCard, CharacterCardData, ChubImporter};
pub use provider::{BackendKind, TextBackend};
pub use providers::{KoboldApi, OpenRouterApi};
pub use response::{ResponseStream, UnifiedResponse};
pub use types::*;
