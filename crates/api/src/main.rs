mod response;
mod routes;

use goglobal_core::config::Settings;
use goglobal_core::ratelimit::RateLimiter;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(e) = settings.validate_backend() {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, backend = ?settings.backend, "refusing to start without provider credentials");
        return Err(e);
    }

    let provider = goglobal_core::analysis::provider_from_settings(&settings)?;
    let state = routes::AppState {
        provider,
        limiter: RateLimiter::per_minute(settings.max_requests_per_minute),
        pause: settings.analysis_delay,
        development: settings.is_development(),
    };
    let app = routes::router(state, &settings.frontend_url)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(
        %addr,
        env = %settings.app_env,
        frontend_url = %settings.frontend_url,
        max_requests_per_minute = settings.max_requests_per_minute,
        "api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(settings.app_env.clone().into()),
            ..Default::default()
        },
    )))
}
