use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use bid_demand::config::{Config, EnvConfig};
use bid_demand::data::loader::load_bids;
use bid_demand::demand::{build_panel, PanelSummary};
use bid_demand::monitoring::logger::{RunLogger, RunRecord};
use bid_demand::output::persist_panel;

#[derive(Parser, Debug)]
#[command(name = "bid-demand", version, about = "Align auction bids into per-bidder demand vectors")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Bid panel CSV (overrides config and BIDS_INPUT_PATH)
    #[arg(short, long)]
    input: Option<String>,

    /// Output JSON path (overrides config and DEMAND_OUTPUT_PATH)
    #[arg(short, long)]
    output: Option<String>,

    /// Assemble bidders across a worker pool
    #[arg(long)]
    parallel: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "bid_demand=info".into()),
        )
        .init();

    tracing::info!("Loading configuration...");
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env(&EnvConfig::load()?);

    config.apply_cli(cli.input, cli.output, cli.parallel, cli.pretty);

    tracing::info!("Input: {}", config.input.path);
    tracing::info!("Duplicate policy: {:?}", config.demand.duplicate_policy);
    tracing::info!("Parallel: {}", config.demand.parallel);

    let report = load_bids(&config.input.path, &config.input)?;
    let records = report.records.len();

    let panel = build_panel(report.records, &config.demand);
    let summary = PanelSummary::from_panel(&panel);
    tracing::info!(
        "Assembled {} rounds for {} bidders (widest catalog: {} markets)",
        summary.rounds,
        summary.bidders,
        summary.widest_catalog
    );

    let saved = persist_panel(&panel, &config.output.path, config.output.pretty);

    if config.monitoring.run_log {
        let run = RunRecord {
            finished_at: Utc::now(),
            input: config.input.path.clone(),
            output: config.output.path.clone(),
            records,
            skipped: report.skipped,
            summary,
            saved,
        };
        let logged = RunLogger::new(&config.monitoring.run_log_path)
            .and_then(|logger| logger.log_run(&run));
        if let Err(e) = logged {
            tracing::warn!("Failed to write run log: {:#}", e);
        }
    }

    if saved {
        println!("Demand vectors saved to {}", config.output.path);
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
