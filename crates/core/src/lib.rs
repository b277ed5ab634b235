pub mod analysis;
pub mod domain;
pub mod heuristic;
pub mod llm;
pub mod ratelimit;
pub mod validate;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
    const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 10;
    const DEFAULT_ANALYSIS_DELAY_MS: u64 = 1000;

    /// Which analysis strategy serves `/api/analyze`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum Backend {
        /// OpenAI-compatible chat completions (DeepSeek by default).
        #[default]
        ChatCompletions,
        Gemini,
        Heuristic,
    }

    impl Backend {
        pub fn parse(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "deepseek" | "openai" | "chat" => Ok(Self::ChatCompletions),
                "gemini" => Ok(Self::Gemini),
                "heuristic" | "local" => Ok(Self::Heuristic),
                other => anyhow::bail!(
                    "unknown LLM_PROVIDER {other:?} (expected deepseek, openai, gemini or heuristic)"
                ),
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub backend: Backend,
        pub deepseek_api_key: Option<String>,
        pub gemini_api_key: Option<String>,
        /// Upstream overrides; `None` keeps each client's built-in default.
        pub deepseek_api_url: Option<String>,
        pub deepseek_model: Option<String>,
        pub gemini_base_url: Option<String>,
        pub gemini_model: Option<String>,
        pub llm_max_tokens: Option<u32>,
        pub llm_timeout: Option<Duration>,
        pub prompt_variant: Option<String>,
        pub sentry_dsn: Option<String>,
        pub port: u16,
        pub frontend_url: String,
        pub max_requests_per_minute: u32,
        pub analysis_delay: Duration,
        pub app_env: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let backend = match std::env::var("LLM_PROVIDER") {
                Ok(s) if !s.trim().is_empty() => Backend::parse(&s)?,
                _ => Backend::ChatCompletions,
            };

            let max_requests_per_minute = match std::env::var("MAX_REQUESTS_PER_MINUTE") {
                Ok(s) => s
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("MAX_REQUESTS_PER_MINUTE is not a number: {s}"))?,
                Err(_) => DEFAULT_MAX_REQUESTS_PER_MINUTE,
            };
            anyhow::ensure!(
                max_requests_per_minute >= 1,
                "MAX_REQUESTS_PER_MINUTE must be >= 1"
            );

            let analysis_delay_ms = std::env::var("ANALYSIS_DELAY_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_ANALYSIS_DELAY_MS);

            Ok(Self {
                backend,
                deepseek_api_key: non_empty_var("DEEPSEEK_API_KEY"),
                gemini_api_key: non_empty_var("GEMINI_API_KEY"),
                deepseek_api_url: non_empty_var("DEEPSEEK_API_URL"),
                deepseek_model: non_empty_var("DEEPSEEK_MODEL"),
                gemini_base_url: non_empty_var("GEMINI_BASE_URL"),
                gemini_model: non_empty_var("GEMINI_MODEL"),
                llm_max_tokens: non_empty_var("LLM_MAX_TOKENS").and_then(|s| s.parse().ok()),
                llm_timeout: non_empty_var("LLM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs),
                prompt_variant: non_empty_var("LLM_PROMPT_VARIANT"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                frontend_url: non_empty_var("FRONTEND_URL")
                    .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
                max_requests_per_minute,
                analysis_delay: Duration::from_millis(analysis_delay_ms),
                app_env: non_empty_var("APP_ENV").unwrap_or_else(|| "production".to_string()),
            })
        }

        pub fn is_development(&self) -> bool {
            self.app_env.eq_ignore_ascii_case("development")
        }

        pub fn require_deepseek_api_key(&self) -> anyhow::Result<&str> {
            self.deepseek_api_key
                .as_deref()
                .context("DEEPSEEK_API_KEY is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        /// Fails when the selected backend cannot run with the current environment.
        pub fn validate_backend(&self) -> anyhow::Result<()> {
            match self.backend {
                Backend::ChatCompletions => self.require_deepseek_api_key().map(|_| ()),
                Backend::Gemini => self.require_gemini_api_key().map(|_| ()),
                Backend::Heuristic => Ok(()),
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

}
