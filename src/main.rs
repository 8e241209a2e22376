mod app;
mod feed;
mod risk;
mod telemetry;
mod util;

use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL the `graph/`, `final-risk/` and `risk-scores/` feeds live under.
    #[arg(long, env = "RISK_GRAPH_BASE_URL", default_value = "http://127.0.0.1:8000/api")]
    base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=600))]
    timeout_secs: u64,

    /// Layout seed, decimal or 0x-prefixed hex.
    #[arg(long, default_value = "0x5eed", value_parser = parse_seed)]
    seed: u64,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn parse_seed(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|error| format!("invalid seed `{value}`: {error}"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log_filter)?;

    let feed_config = feed::FeedConfig::new(
        args.base_url.clone(),
        Duration::from_secs(args.timeout_secs),
    );
    let seed = args.seed;
    info!(base_url = %feed_config.base_url, seed = args.seed, "starting risk-graph");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "risk-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::RiskGraphApp::new(cc, feed_config, seed)))),
    )
    .map_err(|error| anyhow!("window event loop failed: {error}"))
}
