//! Shared "train and display" pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! classify uploads -> train -> optional future forecast -> metrics refresh ->
//! reconcile both charts
//!
//! Front-ends can then focus on presentation.

use crate::data::service::ForecastBackend;
use crate::domain::{Horizon, Metrics, TargetSeries, TrainParams, UploadedFile};
use crate::error::ForecastError;
use crate::models::ModelVariant;
use crate::report::reconcile::{ChartPlan, DisplaySeries, reconcile};
use crate::workflow::ForecastWorkflow;

/// What a front-end needs to show for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartPanel {
    Series {
        model: ModelVariant,
        series: DisplaySeries,
    },
    /// The source model exists but its data could not be fetched.
    Unavailable {
        target: TargetSeries,
        model: ModelVariant,
        reason: String,
    },
    /// No model feeds this chart for the current selection.
    NoSource { target: TargetSeries },
}

/// All computed outputs for the selected model.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub selected: ModelVariant,
    pub metrics: Metrics,
    pub births: ChartPanel,
    pub population: ChartPanel,
    /// Non-fatal problems worth showing next to the data.
    pub notices: Vec<String>,
}

/// Inputs for a single train submission.
#[derive(Debug, Clone)]
pub struct TrainJob {
    pub files: Vec<UploadedFile>,
    pub model: ModelVariant,
    pub params: TrainParams,
    /// Also request a future forecast of this many years.
    pub horizon: Option<u32>,
}

/// Train, optionally forecast, and assemble the dashboard.
///
/// An out-of-range horizon or a failed or rejected train is an error here; a
/// failed forecast leaves the trained data in place and is reported as a notice.
pub fn run_train<B: ForecastBackend>(
    workflow: &ForecastWorkflow<B>,
    job: &TrainJob,
) -> Result<Dashboard, ForecastError> {
    // Validated before training so a bad horizon never reaches the service.
    let horizon = job.horizon.map(Horizon::new).transpose()?;
    workflow.train(&job.files, job.model, job.params.clone())?;

    let mut notices = Vec::new();
    if let Some(horizon) = horizon {
        match workflow.forecast_future(&job.files, job.model, horizon.years()) {
            Ok(future) => tracing::info!("future forecast covers {} years", future.len()),
            Err(err) => notices.push(format!("future forecast failed: {err}")),
        }
    }

    let mut dashboard = assemble_dashboard(workflow, job.model, job.horizon)?;
    notices.append(&mut dashboard.notices);
    dashboard.notices = notices;
    Ok(dashboard)
}

/// Build both charts for `selected` from the workflow's trained state.
///
/// The selected model's chart always comes from the workflow. The population
/// chart comes from the workflow when the population model is selected, and
/// is otherwise refreshed from the service's persisted results.
pub fn assemble_dashboard<B: ForecastBackend>(
    workflow: &ForecastWorkflow<B>,
    selected: ModelVariant,
    horizon: Option<u32>,
) -> Result<Dashboard, ForecastError> {
    let snapshot = workflow.snapshot();
    let trained = snapshot
        .state
        .last_good()
        .filter(|t| t.model == selected)
        .ok_or(ForecastError::NotTrained { model: selected })?;

    let mut notices = Vec::new();

    // The stored metrics carry MSE/R2 as well; fall back to the train response.
    let metrics = match workflow.fetch_metrics(selected) {
        Ok(metrics) if !metrics.is_empty() => metrics,
        Ok(_) => trained.result.metrics.clone(),
        Err(err) => {
            notices.push(format!("showing training metrics only: {err}"));
            trained.result.metrics.clone()
        }
    };

    let plan = ChartPlan::for_selection(selected);
    let primary = ChartPanel::Series {
        model: selected,
        series: reconcile(
            selected.target(),
            &trained.result.historical,
            &trained.result.test_prediction,
            trained.future.as_ref(),
        ),
    };

    let births = match plan.births {
        Some(_) => primary.clone(),
        None => ChartPanel::NoSource {
            target: TargetSeries::Births,
        },
    };
    let population = if plan.uses_trained(TargetSeries::Population, selected) {
        primary
    } else {
        stored_panel(workflow, plan.population, horizon, &mut notices)
    };

    Ok(Dashboard {
        selected,
        metrics,
        births,
        population,
        notices,
    })
}

/// Chart for `model` from persisted results, for a front-end that only reads.
///
/// Unlike the secondary chart of a dashboard, an out-of-range horizon is the
/// caller's mistake and fails before anything is fetched.
pub fn preds_panel<B: ForecastBackend>(
    workflow: &ForecastWorkflow<B>,
    model: ModelVariant,
    horizon: Option<u32>,
) -> Result<(ChartPanel, Vec<String>), ForecastError> {
    if let Some(years) = horizon {
        Horizon::new(years)?;
    }
    let mut notices = Vec::new();
    let panel = stored_panel(workflow, model, horizon, &mut notices);
    Ok((panel, notices))
}

/// Chart for `model` from its persisted predictions (plus stored forecast).
pub fn stored_panel<B: ForecastBackend>(
    workflow: &ForecastWorkflow<B>,
    model: ModelVariant,
    horizon: Option<u32>,
    notices: &mut Vec<String>,
) -> ChartPanel {
    let preds = match workflow.fetch_historical_predictions(model) {
        Ok(preds) => preds,
        Err(err) => {
            return ChartPanel::Unavailable {
                target: model.target(),
                model,
                reason: err.to_string(),
            };
        }
    };

    let future = horizon.and_then(|years| match workflow.fetch_stored_forecast(model, years) {
        Ok(future) => Some(future),
        Err(err) => {
            notices.push(format!("{} future forecast unavailable: {err}", model.display_label()));
            None
        }
    });

    ChartPanel::Series {
        model,
        series: reconcile(model.target(), &preds.historical, &preds.prediction, future.as_ref()),
    }
}
