use crate::response::{timestamp, AnalyzeResponse, ApiError};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, DefaultBodyLimit, OriginalUri, State},
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use goglobal_core::analysis::{orchestrator, AnalysisProvider};
use goglobal_core::ratelimit::RateLimiter;
use goglobal_core::validate;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

pub const SERVICE_NAME: &str = "GOGLOBAL Market Analysis API";

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn AnalysisProvider>,
    pub limiter: RateLimiter,
    /// Pause between two consecutive market analyses.
    pub pause: Duration,
    /// Enables `/api/test` and error detail in 500 responses.
    pub development: bool,
}

pub fn router(state: AppState, frontend_url: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = frontend_url
        .parse()
        .map_err(|_| anyhow::anyhow!("FRONTEND_URL is not a valid origin: {frontend_url}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // A known path with the wrong method answers like an unknown path.
    let mut api = Router::new()
        .route("/health", get(health).fallback(not_found))
        .route("/analyze", post(analyze).fallback(not_found));
    if state.development {
        api = api.route("/test", post(echo).fallback(not_found));
    }

    Ok(Router::new()
        .route("/", get(index).fallback(not_found))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/api/health",
            "analyze": "POST /api/analyze",
        },
        "timestamp": timestamp(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": timestamp(),
        "service": SERVICE_NAME,
    }))
}

async fn analyze(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let decision = state
        .limiter
        .check(&client)
        .await
        .map_err(|e| ApiError::internal(e, state.development))?;
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let input = validate::validate_request(&body)?;

    let run_id = Uuid::new_v4();
    tracing::info!(
        %run_id,
        %client,
        product = %input.product_name,
        markets = ?input.target_markets,
        "analysis requested"
    );

    let markets = orchestrator::analyze_product(state.provider.clone(), Arc::new(input), state.pause)
        .instrument(tracing::info_span!("analysis_run", %run_id))
        .await
        .map_err(|e| ApiError::internal(e, state.development))?;

    Ok(Json(AnalyzeResponse::new(markets)))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Test endpoint working",
        "receivedData": body,
        "timestamp": timestamp(),
    }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound {
        path: uri.path().to_string(),
    }
}
