//! LLM integration for template selection, caption writing and judging.
//!
//! Provides a provider abstraction over multiple LLM backends (Ollama, Anthropic,
//! OpenAI, Hyperbolic), structured prompts, tolerant response parsing, and a
//! client that walks a provider fallback chain.

pub(crate) mod anthropic;
pub(crate) mod client;
pub(crate) mod hyperbolic;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod prompt;
pub(crate) mod provider;
pub(crate) mod schema;

pub use client::LlmClient;
pub use prompt::{ContextBlock, StructuredPrompt};
pub use provider::{resolve_env_var, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
pub use schema::{parse_response, ResponseSchema};
