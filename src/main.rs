use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use solar_power_predictor::{
    api,
    config::{Config, DEFAULT_CONFIG_PATH},
    dataset::{load_csv, write_csv, TARGET_COLUMN},
    features::{build_features, select_features},
    ml::TrainingPipeline,
    serving::ServingContext,
    telemetry, PredictorError,
};

#[derive(Debug, Parser)]
#[command(name = "solar-power-predictor", version, about = "Solar AC power prediction")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Derive features from the cleaned sensor CSV and write the prepared table
    Prepare,
    /// Train regressors on the prepared table and save the artifact
    Train,
    /// Serve predictions over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let result = match cli.command {
        Command::Prepare => prepare(&cfg),
        Command::Train => train(&cfg),
        Command::Serve => serve(cfg).await,
    };
    if let Err(e) = &result {
        error!(error = %format!("{:#}", e), "fatal error");
    }
    result
}

fn prepare(cfg: &Config) -> Result<()> {
    let raw = load_csv(&cfg.paths.raw_data)
        .with_context(|| format!("reading {}", cfg.paths.raw_data.display()))?;
    if !raw.has_column(TARGET_COLUMN) {
        return Err(PredictorError::MissingColumn(TARGET_COLUMN.to_string()).into());
    }
    let prepared = build_features(&raw)?;
    info!(features = ?select_features(&prepared), "available features");
    write_csv(&prepared, &cfg.paths.prepared_data)?;

    info!(
        rows = prepared.len(),
        columns = ?prepared.column_names(),
        path = %cfg.paths.prepared_data.display(),
        "prepared dataset written"
    );
    Ok(())
}

fn train(cfg: &Config) -> Result<()> {
    let table = load_csv(&cfg.paths.prepared_data)
        .with_context(|| format!("reading {}", cfg.paths.prepared_data.display()))?;
    let table = build_features(&table)?;

    let report = TrainingPipeline::new(cfg.training.clone()).run(&table, &cfg.paths.models_dir)?;
    for (model, metrics) in &report.metrics {
        info!(model = model.label(), %metrics, "held-out metrics");
    }
    if !report.secondary_available {
        warn!("secondary regressor unavailable in this build");
    }
    info!(
        recommended = report.recommended.label(),
        models_dir = %cfg.paths.models_dir.display(),
        "training complete"
    );
    Ok(())
}

async fn serve(cfg: Config) -> Result<()> {
    let ctx = ServingContext::load(&cfg)?;
    let app = api::router(ctx.clone(), cfg.server.request_timeout());

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0, service will be reachable from the network");
    }
    info!(%addr, fallback = ctx.is_fallback(), "starting solar power predictor");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
