//! Error types.
//!
//! Library operations return `ForecastError` (or one of its member structs);
//! the binary folds everything into `AppError`, which carries the process exit
//! code: `2` for input the user can correct, `4` for service and IO failures.

use thiserror::Error;

use crate::domain::FileRole;
use crate::models::ModelVariant;

/// One or more of the four required roles had no matching file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing input files for: {}. Filenames must contain 'birth', 'death', 'pop' or 'mig'.", join_roles(.missing_roles))]
pub struct ClassificationError {
    pub missing_roles: Vec<FileRole>,
}

fn join_roles(roles: &[FileRole]) -> String {
    roles
        .iter()
        .map(|r| r.field_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A model identifier that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown model '{id}'.")]
pub struct UnknownModelError {
    pub id: String,
}

/// A forecast horizon outside `1..=22` years.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Forecast horizon must be between 1 and 22 years (got {years}).")]
pub struct InvalidHorizonError {
    pub years: u32,
}

/// A trainer parameter named like one of the submission's own form fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parameter '{key}' is reserved: the request already sets that field.")]
pub struct ReservedParamError {
    pub key: String,
}

/// Anything that went wrong talking to the forecasting service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Forecast service error: {detail}")]
pub struct BackendError {
    pub detail: String,
}

impl BackendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Errors surfaced by workflow commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    UnknownModel(#[from] UnknownModelError),
    #[error(transparent)]
    InvalidHorizon(#[from] InvalidHorizonError),
    #[error(transparent)]
    ReservedParam(#[from] ReservedParamError),
    #[error("Model '{}' has not been trained in this session.", .model.id())]
    NotTrained { model: ModelVariant },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("A training request is already in flight.")]
    WorkflowBusy,
}

impl ForecastError {
    /// Process exit code used by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ForecastError::Backend(_) => 4,
            _ => 2,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl From<ClassificationError> for AppError {
    fn from(err: ClassificationError) -> Self {
        ForecastError::from(err).into()
    }
}

impl From<UnknownModelError> for AppError {
    fn from(err: UnknownModelError) -> Self {
        ForecastError::from(err).into()
    }
}

impl From<InvalidHorizonError> for AppError {
    fn from(err: InvalidHorizonError) -> Self {
        ForecastError::from(err).into()
    }
}

impl From<ReservedParamError> for AppError {
    fn from(err: ReservedParamError) -> Self {
        ForecastError::from(err).into()
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        ForecastError::from(err).into()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
