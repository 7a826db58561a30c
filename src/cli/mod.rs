//! Command-line parsing for the `dfc` driver.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! workflow; dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::is_reserved_param;
use crate::models::ModelVariant;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dfc", version, about = "Demography forecast workflow driver")]
pub struct Cli {
    /// Forecasting service base URL (overrides DEMO_FORECAST_URL).
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload the four CSVs, train a model, and print metrics and both charts.
    Train(TrainArgs),
    /// Print stored metrics for a model.
    Metrics(ModelArgs),
    /// Print stored historical/test predictions for a model.
    Preds(PredsArgs),
    /// Print a stored future forecast for a model.
    Forecast(ForecastArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Input CSVs; roles are inferred from names containing birth/death/pop/mig.
    #[arg(short = 'f', long = "file", value_name = "CSV", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Model to train.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelVariant::Sarimax)]
    pub model: ModelVariant,

    /// Extra trainer parameter as KEY=VALUE (repeatable).
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Also forecast this many years past the data (1-22).
    #[arg(short = 'y', long)]
    pub years: Option<u32>,

    /// Export both charts to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelVariant,
}

#[derive(Debug, Args, Clone)]
pub struct PredsArgs {
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelVariant,

    /// Extend the chart with a stored forecast of this many years.
    #[arg(short = 'y', long)]
    pub years: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelVariant,

    /// Horizon in years (1-22).
    #[arg(short = 'y', long)]
    pub years: u32,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    if is_reserved_param(key) {
        return Err(format!("'{key}' is set by the request itself and cannot be passed as a parameter"));
    }
    Ok((key.to_string(), value.to_string()))
}
