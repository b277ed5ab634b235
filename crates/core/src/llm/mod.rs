pub mod chat;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;
pub mod relay;

use crate::config::{Backend, Settings};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// OpenAI-compatible `/chat/completions` (DeepSeek, OpenAI, ...).
    ChatCompletions,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat_completions",
            Self::Gemini => "gemini",
        }
    }
}

/// A single text-generation call: prompt in, model text out.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete_json(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Builds the client for the configured remote backend, or `None` for the
/// heuristic backend.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<dyn LlmClient>>> {
    let client: Arc<dyn LlmClient> = match settings.backend {
        Backend::ChatCompletions => Arc::new(chat::ChatCompletionsClient::from_settings(settings)?),
        Backend::Gemini => Arc::new(gemini::GeminiClient::from_settings(settings)?),
        Backend::Heuristic => return Ok(None),
    };
    Ok(Some(client))
}
