//! avi-llm: Language Model Adapters
//!
//! ## Supported Providers & Endpoints
//!
//! | Provider | Base URL | Auth Method | Tool call style |
//! |----------|----------|-------------|-----------------|
//! | Ollama | `http://localhost:11434` | none | native list or embedded JSON in text |
//! | Mistral | `https://api.mistral.ai` | `Bearer {MISTRAL_API_KEY}` | `choices[0].message.tool_calls` |
//!
//! Both produce a [`avi_core::NormalizedModelResponse`]; the provider is
//! chosen once at startup by [`build_adapter`].

mod http;
pub mod mistral;
pub mod ollama;
pub mod prompt;
pub mod provider;

pub use mistral::MistralAdapter;
pub use ollama::{extract_embedded_invocation, OllamaAdapter};
pub use prompt::system_prompt;
pub use provider::{build_adapter, BoxedAdapter, ModelAdapter, ModelQuery, ResolvedQuery};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::provider::{build_adapter, BoxedAdapter, ModelAdapter, ModelQuery};
    pub use super::system_prompt;
}
