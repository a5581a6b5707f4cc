//! Account research service: binary entrypoint.
//! Loads config, builds the aggregator with every provider adapter and
//! serves the research API plus `/metrics`.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use account_research::{api, metrics::Metrics, Aggregator, AppState, ResearchConfig};

/// Compact logs by default; JSON lines when RESEARCH_LOG_JSON=1.
/// A subscriber installed by the runtime takes precedence.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("research=info,warn"));
    let json = std::env::var("RESEARCH_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already set");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ResearchConfig::load_default().context("loading research config")?;
    tracing::info!(config = ?cfg, "research config loaded");

    let aggregator = Aggregator::from_config(&cfg).context("building aggregator")?;
    let metrics = Metrics::init()?;

    let router = api::router(AppState::new(aggregator)).merge(metrics.router());
    Ok(router.into())
}
