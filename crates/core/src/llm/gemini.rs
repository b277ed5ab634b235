use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::CompletionEnvelope;
use crate::llm::{LlmClient, Provider};
use anyhow::Context;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url = settings
            .gemini_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_output_tokens = settings.llm_max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);
        let timeout = settings
            .llm_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self::new(api_key, base_url, model, max_output_tokens, timeout)
    }

    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_output_tokens,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete_json(&self, prompt: &str) -> anyhow::Result<String> {
        let req = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json",
            },
        };

        let res = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        let envelope = serde_json::from_str::<CompletionEnvelope>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))?;
        match envelope.text() {
            Some(content) => Ok(content.to_string()),
            None => Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "content",
                detail: "no content in Gemini response".to_string(),
                raw_output: Some(text),
            }
            .into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Captured = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    async fn spawn_upstream(status: StatusCode, body: Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/v1beta/models/:action",
                post(
                    move |State(captured): State<Captured>,
                          Path(action): Path<String>,
                          headers: HeaderMap,
                          Json(req): Json<Value>| {
                        let body = body.clone();
                        let key = headers
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        async move {
                            captured.lock().await.push((action, key, req));
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
        (format!("http://{addr}/v1beta"), captured)
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(
            "g-test".to_string(),
            base_url,
            DEFAULT_MODEL.to_string(),
            DEFAULT_MAX_OUTPUT_TOKENS,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_generation_config_and_reads_candidate_text() {
        let (base_url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"candidates": [{"content": {"parts": [{"text": "```json\n{}\n```"}]}}]}),
        )
        .await;

        let text = client(base_url).complete_json("analyse Brazil").await.unwrap();
        assert_eq!(text, "```json\n{}\n```");

        let captured = captured.lock().await;
        let (action, key, req) = &captured[0];
        assert_eq!(action, "gemini-1.5-pro:generateContent");
        assert_eq!(key.as_deref(), Some("g-test"));
        assert_eq!(req["contents"][0]["parts"][0]["text"], "analyse Brazil");
        assert_eq!(req["generationConfig"]["topK"], 40);
        assert_eq!(req["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(req["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn from_settings_uses_configured_endpoint_and_model() {
        let (base_url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"candidates": [{"content": {"parts": [{"text": "{}"}]}}]}),
        )
        .await;
        let settings = Settings {
            gemini_api_key: Some("g-configured".to_string()),
            gemini_base_url: Some(base_url),
            gemini_model: Some("gemini-test".to_string()),
            llm_max_tokens: Some(1024),
            ..Settings::default()
        };

        GeminiClient::from_settings(&settings)
            .unwrap()
            .complete_json("x")
            .await
            .unwrap();

        let captured = captured.lock().await;
        let (action, key, req) = &captured[0];
        assert_eq!(action, "gemini-test:generateContent");
        assert_eq!(key.as_deref(), Some("g-configured"));
        assert_eq!(req["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[tokio::test]
    async fn connection_errors_do_not_leak_the_api_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}/v1beta"))
            .complete_json("x")
            .await
            .unwrap_err();
        let rendered = format!("{err:#} {err:?}");
        assert!(rendered.contains("Gemini request failed"));
        assert!(!rendered.contains("g-test"), "{rendered}");
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let (base_url, _) =
            spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;

        let err = client(base_url).complete_json("x").await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.provider, Provider::Gemini);
        assert_eq!(diag.stage, "http");
    }
}
