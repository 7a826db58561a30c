//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads service configuration
//! - drives the forecast workflow
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, ForecastArgs, ModelArgs, PredsArgs, TrainArgs};
use crate::config::ServiceConfig;
use crate::data::ServiceClient;
use crate::domain::{TrainParams, UploadedFile};
use crate::error::AppError;
use crate::workflow::ForecastWorkflow;

pub mod pipeline;

/// Entry point for the `dfc` binary.
pub fn run() -> Result<(), AppError> {
    if let Err(err) = crate::logging::init() {
        eprintln!("warning: {err}");
    }

    let cli = crate::cli::Cli::parse();

    let mut config = ServiceConfig::from_env()?;
    if let Some(url) = &cli.url {
        config = config.with_base_url(url)?;
    }
    tracing::debug!("forecast service at {}", config.base_url);
    let workflow = ForecastWorkflow::new(ServiceClient::new(&config)?);

    match cli.command {
        Command::Train(args) => handle_train(&workflow, args),
        Command::Metrics(args) => handle_metrics(&workflow, args),
        Command::Preds(args) => handle_preds(&workflow, args),
        Command::Forecast(args) => handle_forecast(&workflow, args),
    }
}

fn handle_train(workflow: &ForecastWorkflow<ServiceClient>, args: TrainArgs) -> Result<(), AppError> {
    let files = args
        .files
        .iter()
        .map(|p| UploadedFile::from_path(p))
        .collect::<Result<Vec<_>, _>>()?;

    let job = pipeline::TrainJob {
        files,
        model: args.model,
        params: args.params.into_iter().collect::<TrainParams>(),
        horizon: args.years,
    };
    let dashboard = pipeline::run_train(workflow, &job)?;

    println!("{}", crate::report::format_dashboard(&dashboard));

    if let Some(path) = &args.export {
        crate::io::export::write_dashboard_csv(path, &dashboard)?;
    }
    Ok(())
}

fn handle_metrics(workflow: &ForecastWorkflow<ServiceClient>, args: ModelArgs) -> Result<(), AppError> {
    let metrics = workflow.fetch_metrics(args.model)?;
    println!("{} ({})", args.model.display_label(), args.model.id());
    println!("{}", crate::report::format_metrics(&metrics));
    Ok(())
}

fn handle_preds(workflow: &ForecastWorkflow<ServiceClient>, args: PredsArgs) -> Result<(), AppError> {
    let (panel, notices) = pipeline::preds_panel(workflow, args.model, args.years)?;
    match panel {
        pipeline::ChartPanel::Series { model, series } => {
            println!("{}", crate::report::format_series(&series, model.display_label()));
        }
        pipeline::ChartPanel::Unavailable { reason, .. } => {
            return Err(AppError::new(4, reason));
        }
        pipeline::ChartPanel::NoSource { .. } => {}
    }
    for notice in notices {
        eprintln!("note: {notice}");
    }
    Ok(())
}

fn handle_forecast(workflow: &ForecastWorkflow<ServiceClient>, args: ForecastArgs) -> Result<(), AppError> {
    let future = workflow.fetch_stored_forecast(args.model, args.years)?;
    println!("{}", crate::report::format_future(&future, args.model.display_label()));
    Ok(())
}
