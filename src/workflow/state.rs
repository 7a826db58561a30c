//! Observable workflow state.
//!
//! Observers never mutate state; they read `WorkflowSnapshot`s, each stamped
//! with a version that increases by one on every transition. Snapshots share
//! the state behind an `Arc`, so "has anything changed?" is a pointer or
//! version comparison.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{FutureSeries, Horizon, TrainResult};
use crate::error::BackendError;
use crate::models::ModelVariant;

/// Everything known about the most recent successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub model: ModelVariant,
    pub result: TrainResult,
    /// Attached by a successful future forecast; cleared by the next train.
    pub future: Option<FutureSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Training {
        model: ModelVariant,
        previous: Option<TrainedModel>,
    },
    Trained(TrainedModel),
    ForecastingFuture {
        trained: TrainedModel,
        horizon: Horizon,
    },
    Error {
        last_good: Option<TrainedModel>,
        cause: BackendError,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Training { .. } => "training",
            WorkflowState::Trained(_) => "trained",
            WorkflowState::ForecastingFuture { .. } => "forecasting",
            WorkflowState::Error { .. } => "error",
        }
    }

    /// The most recent successful training data, whatever the current phase.
    pub fn last_good(&self) -> Option<&TrainedModel> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Training { previous, .. } => previous.as_ref(),
            WorkflowState::Trained(trained) => Some(trained),
            WorkflowState::ForecastingFuture { trained, .. } => Some(trained),
            WorkflowState::Error { last_good, .. } => last_good.as_ref(),
        }
    }

    pub fn is_training(&self) -> bool {
        matches!(self, WorkflowState::Training { .. })
    }
}

/// An immutable, versioned view of the workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub version: u64,
    pub changed_at: DateTime<Utc>,
    pub state: Arc<WorkflowState>,
}

impl WorkflowSnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            version: 0,
            changed_at: Utc::now(),
            state: Arc::new(WorkflowState::Idle),
        }
    }

    pub(crate) fn next(&self, state: WorkflowState) -> Self {
        Self {
            version: self.version + 1,
            changed_at: Utc::now(),
            state: Arc::new(state),
        }
    }
}
