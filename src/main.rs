//! AANKOOPKOMPAS: house price estimator and bid calculator for France
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the registry clients into the estimator and valuation engine,
//! and serves the HTTP API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use aankoopkompas::api::{self, routes::ApiState};
use aankoopkompas::config;
use aankoopkompas::estimator::commune::CommuneAggregator;
use aankoopkompas::estimator::ComparableSalesEstimator;
use aankoopkompas::registry::cadastre::CadastreClient;
use aankoopkompas::registry::cquest::CquestClient;
use aankoopkompas::registry::geo_dvf::GeoDvfClient;

const BANNER: &str = r#"
    _             _                  _
   / \   __ _ _ _| | _____  ___  _ _| | _____  _ __ ___  _ __   __ _ ___
  / _ \ / _` | '_ \ |/ / _ \/ _ \| '_ \ |/ / _ \| '_ ` _ \| '_ \ / _` / __|
 / ___ \ (_| | | | |   < (_) | (_) | |_) |   < (_) | | | | | | |_) | (_| \__ \
/_/   \_\__,_|_| |_|_|\_\___/ \___/| .__/|_|\_\___/|_| |_| |_| .__/ \__,_|___/
                                   |_|                       |_|
  Comparable-sales estimator and bid calculator
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("KOMPAS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // Logging first, so a missing config file is reported
    init_logging();

    let cfg = config::AppConfig::load_or_default(&config_path)?;

    println!("{BANNER}");
    info!(
        config = %config_path,
        port = cfg.server.port,
        radii = ?cfg.estimator.radii_m,
        "Aankoopkompas starting up"
    );

    // -- Initialise components -------------------------------------------

    let sales = CquestClient::new(&cfg.registry)?;
    let communes = GeoDvfClient::new(&cfg.registry)?;
    let parcels = CadastreClient::new(&cfg.registry)?;

    let state = Arc::new(ApiState {
        estimator: ComparableSalesEstimator::new(Arc::new(sales), cfg.search_policy()),
        commune: CommuneAggregator::new(Arc::new(communes), cfg.commune_policy()),
        parcels: Arc::new(parcels),
        valuation: cfg.valuation_policy(),
    });

    // -- Serve -------------------------------------------------------------

    info!(port = cfg.server.port, "Press Ctrl+C to stop.");
    api::serve(state, cfg.server.port, cfg.server.enable_cors, shutdown_signal()).await?;

    info!("Aankoopkompas shut down cleanly.");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received.");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aankoopkompas=info,tower_http=warn"));

    let json_logging = std::env::var("KOMPAS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
