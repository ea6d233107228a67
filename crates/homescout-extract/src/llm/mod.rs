//! Schema-constrained extraction through a text-generation service.

mod extractor;
mod openai;

pub use extractor::{LlmExtractor, MAX_PROMPT_CHARS};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StrategyError;

/// A text-generation service that answers with JSON matching a schema.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw JSON text of the model's answer.
    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<String, StrategyError>;
}
