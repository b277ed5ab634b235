use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::CompletionEnvelope;
use crate::llm::{LlmClient, Provider};
use anyhow::Context;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible chat completions client (DeepSeek by default).
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_deepseek_api_key()?.to_string();
        let url = settings
            .deepseek_api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let model = settings
            .deepseek_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = settings.llm_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout = settings
            .llm_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self::new(api_key, url, model, max_tokens, timeout)
    }

    pub fn new(
        api_key: String,
        url: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            url,
            model,
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ChatCompletionsClient {
    fn provider(&self) -> Provider {
        Provider::ChatCompletions
    }

    async fn complete_json(&self, prompt: &str) -> anyhow::Result<String> {
        let res = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("chat completions request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read chat completions response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError {
                provider: Provider::ChatCompletions,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        let envelope = serde_json::from_str::<CompletionEnvelope>(&text)
            .with_context(|| format!("failed to decode chat completions response: {text}"))?;
        match envelope.text() {
            Some(content) => Ok(content.to_string()),
            None => Err(LlmDiagnosticsError {
                provider: Provider::ChatCompletions,
                stage: "content",
                detail: "no content in chat completions response".to_string(),
                raw_output: Some(text),
            }
            .into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn spawn_upstream(status: StatusCode, body: Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(captured): State<Captured>,
                          headers: axum::http::HeaderMap,
                          Json(req): Json<Value>| {
                        let body = body.clone();
                        async move {
                            let auth = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            captured.lock().await.push((auth, req));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/chat/completions"), captured)
    }

    fn client(url: String) -> ChatCompletionsClient {
        ChatCompletionsClient::new(
            "sk-test".to_string(),
            url,
            DEFAULT_MODEL.to_string(),
            DEFAULT_MAX_TOKENS,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_prompt_and_returns_message_content() {
        let (url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": "{\"market\":\"Japan\"}"}}]}),
        )
        .await;

        let text = client(url).complete_json("analyse Japan").await.unwrap();
        assert_eq!(text, "{\"market\":\"Japan\"}");

        let captured = captured.lock().await;
        let (auth, req) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(req["model"], "deepseek-chat");
        assert_eq!(req["messages"][0]["role"], "user");
        assert_eq!(req["messages"][0]["content"], "analyse Japan");
        assert_eq!(req["max_tokens"], 4000);
        assert_eq!(req["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn from_settings_uses_configured_url_and_model() {
        let (url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "{}"}}]}),
        )
        .await;
        let settings = Settings {
            deepseek_api_key: Some("sk-configured".to_string()),
            deepseek_api_url: Some(url),
            deepseek_model: Some("gpt-4o-mini".to_string()),
            llm_max_tokens: Some(2000),
            ..Settings::default()
        };

        ChatCompletionsClient::from_settings(&settings)
            .unwrap()
            .complete_json("x")
            .await
            .unwrap();

        let captured = captured.lock().await;
        let (auth, req) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-configured"));
        assert_eq!(req["model"], "gpt-4o-mini");
        assert_eq!(req["max_tokens"], 2000);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _) =
            spawn_upstream(StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})).await;

        let err = client(url).complete_json("x").await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert!(diag.raw_output.as_deref().unwrap().contains("slow down"));
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let (url, _) = spawn_upstream(StatusCode::OK, json!({"choices": []})).await;

        let err = client(url).complete_json("x").await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "content");
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        // Nothing listens on the discard port.
        let err = client("http://127.0.0.1:9/v1/chat/completions".to_string())
            .complete_json("x")
            .await;
        assert!(err.is_err());
    }
}
