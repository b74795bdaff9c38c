use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trendcast::application::pipeline::Analyzer;
use trendcast::config::AnalysisOptions;
use trendcast::domain::features::Feature;
use trendcast::domain::market::PriceBar;
use trendcast::domain::market::price_bar::is_ordered;
use trendcast::domain::profile::Profile;

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to OHLCV history CSV with header date,open,high,low,close,volume
    #[arg(long)]
    input: PathBuf,

    /// Forecast horizon in trading days
    #[arg(long, default_value_t = 5)]
    horizon: u32,

    /// Analysis profile: conservative, momentum or trend-following
    #[arg(long, default_value = "conservative")]
    profile: String,

    /// Comma-separated indicator columns (e.g. "RSI,MACD"); defaults to the
    /// profile's subset
    #[arg(long)]
    features: Option<String>,

    /// Disable importance-based feature pruning
    #[arg(long)]
    no_prune: bool,
}

fn load_bars(path: &PathBuf) -> Result<Vec<PriceBar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open history CSV at {:?}", path))?;

    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let record: BarRecord = record.context("Malformed history row")?;
        bars.push(PriceBar {
            date: record.date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    Ok(bars)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let profile: Profile = args.profile.parse()?;
    let mut options = AnalysisOptions::new(profile);
    if let Some(list) = &args.features {
        let features = list
            .split(',')
            .map(|name| name.parse::<Feature>())
            .collect::<Result<Vec<_>>>()?;
        options = options.with_features(features);
    }
    if args.no_prune {
        options = options.without_pruning();
    }

    let bars = load_bars(&args.input)?;
    anyhow::ensure!(
        is_ordered(&bars),
        "History must be ordered ascending by date with unique dates"
    );
    println!("Loaded {} sessions from {:?}", bars.len(), args.input);

    let analyzer = Analyzer::default();
    match analyzer.analyze(&bars, args.horizon, &options)? {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => {
            println!(
                "Insufficient history for {} sessions at horizon {}; nothing to predict.",
                bars.len(),
                args.horizon
            );
        }
    }

    Ok(())
}
