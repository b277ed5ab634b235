use clap::{Parser, Subcommand};
use goglobal_core::analysis::orchestrator;
use goglobal_core::config::{Backend, Settings};
use goglobal_core::heuristic;
use goglobal_core::llm::prompt::{self, PromptVariant};
use goglobal_core::llm::Provider;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod input;

#[derive(Debug, Parser)]
#[command(name = "goglobal_worker", about = "Run market viability analyses from the command line")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyse every target market with the configured provider.
    Analyze {
        /// Product JSON file (`{"productData": {...}}` or the bare object).
        #[arg(long)]
        input: PathBuf,

        /// Overrides LLM_PROVIDER (deepseek, openai, gemini, heuristic).
        #[arg(long)]
        provider: Option<String>,

        /// Target market; repeat to analyse several. Replaces the file's list.
        #[arg(long = "market")]
        markets: Vec<String>,

        /// Pause between markets in milliseconds. Overrides ANALYSIS_DELAY_MS.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Print the prompts that would be sent instead of calling the model.
        #[arg(long)]
        dry_run: bool,
    },
    /// Score markets with the local heuristic and print its native reports.
    Estimate {
        #[arg(long)]
        input: PathBuf,

        #[arg(long = "market")]
        markets: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Analyze {
            input,
            provider,
            markets,
            delay_ms,
            dry_run,
        } => {
            if let Some(p) = provider.as_deref() {
                settings.backend = Backend::parse(p)?;
            }
            if let Some(ms) = delay_ms {
                settings.analysis_delay = Duration::from_millis(ms);
            }
            let product = input::load_product(&input, &markets)?;
            if dry_run {
                print_prompts(&settings, &product)
            } else {
                run_analysis(&settings, product).await
            }
        }
        Command::Estimate { input, markets } => {
            let product = input::load_product(&input, &markets)?;
            print_estimates(&product)
        }
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "worker run failed");
    }
    result
}

async fn run_analysis(
    settings: &Settings,
    product: goglobal_core::domain::product::ProductInput,
) -> anyhow::Result<()> {
    settings.validate_backend()?;
    let provider = goglobal_core::analysis::provider_from_settings(settings)?;

    let run_id = uuid::Uuid::new_v4();
    tracing::info!(
        %run_id,
        product = %product.product_name,
        markets = ?product.target_markets,
        "analysis run started"
    );

    let results = orchestrator::analyze_product(provider, Arc::new(product), settings.analysis_delay)
        .instrument(tracing::info_span!("analysis_run", %run_id))
        .await?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Renders each market's prompt without touching the network.
fn print_prompts(
    settings: &Settings,
    product: &goglobal_core::domain::product::ProductInput,
) -> anyhow::Result<()> {
    let provider = match settings.backend {
        Backend::ChatCompletions => Provider::ChatCompletions,
        Backend::Gemini => Provider::Gemini,
        Backend::Heuristic => {
            tracing::info!(
                dry_run = true,
                markets = ?product.target_markets,
                "heuristic backend sends no prompts"
            );
            return Ok(());
        }
    };
    let variant = PromptVariant::resolve(settings.prompt_variant.as_deref(), provider);
    let now = chrono::Utc::now();

    let prompts: Vec<_> = distinct_markets(product)
        .map(|m| {
            serde_json::json!({
                "market": m,
                "prompt": prompt::build_prompt(product, m, variant, now),
            })
        })
        .collect();
    tracing::info!(
        dry_run = true,
        provider = provider.as_str(),
        ?variant,
        prompts = prompts.len(),
        "prompts rendered"
    );

    println!("{}", serde_json::to_string_pretty(&prompts)?);
    Ok(())
}

fn print_estimates(product: &goglobal_core::domain::product::ProductInput) -> anyhow::Result<()> {
    let reports: Vec<_> = distinct_markets(product)
        .map(|market| heuristic::score_market(product, market))
        .collect();
    for report in &reports {
        tracing::info!(
            market = %report.market,
            overall = report.overall_score,
            verdict = report.verdict.as_str(),
            break_even_units = ?report.break_even_units,
            "market estimated"
        );
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

/// Target markets in request order, first occurrence only.
fn distinct_markets(
    product: &goglobal_core::domain::product::ProductInput,
) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    product
        .target_markets
        .iter()
        .map(String::as_str)
        .filter(move |m| seen.insert(*m))
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
