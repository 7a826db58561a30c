//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built from uploads and service responses
//! - held in the workflow's snapshots
//! - reconciled and exported without further conversion

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::error::{AppError, InvalidHorizonError, ReservedParamError};
use crate::models::ModelVariant;

/// Semantic role an uploaded CSV plays in a training submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileRole {
    Births,
    Deaths,
    Population,
    Migration,
}

impl FileRole {
    /// All roles, in the priority order used when classifying filenames.
    pub const ALL: [FileRole; 4] = [
        FileRole::Births,
        FileRole::Deaths,
        FileRole::Population,
        FileRole::Migration,
    ];

    /// Lower-case substring that marks a filename as carrying this role.
    pub fn token(self) -> &'static str {
        match self {
            FileRole::Births => "birth",
            FileRole::Deaths => "death",
            FileRole::Population => "pop",
            FileRole::Migration => "mig",
        }
    }

    /// Multipart form field the service expects this file under.
    pub fn field_name(self) -> &'static str {
        match self {
            FileRole::Births => "births",
            FileRole::Deaths => "deaths",
            FileRole::Population => "population",
            FileRole::Migration => "migration",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The quantity a model variant forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSeries {
    Births,
    Population,
}

impl TargetSeries {
    /// Human-readable label (also the value of the service's `Target` metric column).
    pub fn display_name(self) -> &'static str {
        match self {
            TargetSeries::Births => "Births",
            TargetSeries::Population => "Population",
        }
    }
}

/// A user-supplied file, as received from the front-end.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, naming it after the final path component.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::new(2, format!("Invalid file name '{}'.", path.display())))?
            .to_string();
        let content = fs::read(path)
            .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))?;
        Ok(Self { name, content })
    }
}

// File contents can be large; only the size is useful in logs.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// A complete role -> file assignment. Only the classifier builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFiles {
    pub(crate) births: UploadedFile,
    pub(crate) deaths: UploadedFile,
    pub(crate) population: UploadedFile,
    pub(crate) migration: UploadedFile,
}

impl RoleFiles {
    pub fn get(&self, role: FileRole) -> &UploadedFile {
        match role {
            FileRole::Births => &self.births,
            FileRole::Deaths => &self.deaths,
            FileRole::Population => &self.population,
            FileRole::Migration => &self.migration,
        }
    }

    /// Iterate `(role, file)` pairs in role priority order.
    pub fn iter(&self) -> impl Iterator<Item = (FileRole, &UploadedFile)> + '_ {
        FileRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

/// Extra string hyper-parameters forwarded to the trainer.
pub type TrainParams = BTreeMap<String, String>;

/// Whether `key` is a form field the submission fills in itself.
pub fn is_reserved_param(key: &str) -> bool {
    key == "model" || key == "years" || FileRole::ALL.iter().any(|r| r.field_name() == key)
}

/// Reject parameters that would shadow the model, horizon or file fields.
pub fn check_params(params: &TrainParams) -> Result<(), ReservedParamError> {
    match params.keys().find(|key| is_reserved_param(key)) {
        Some(key) => Err(ReservedParamError { key: key.clone() }),
        None => Ok(()),
    }
}

/// Future forecast length in years, validated to `1..=22`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Horizon(u32);

impl Horizon {
    pub const MIN_YEARS: u32 = 1;
    pub const MAX_YEARS: u32 = 22;

    pub fn new(years: u32) -> Result<Self, InvalidHorizonError> {
        if (Self::MIN_YEARS..=Self::MAX_YEARS).contains(&years) {
            Ok(Self(years))
        } else {
            Err(InvalidHorizonError { years })
        }
    }

    pub fn years(self) -> u32 {
        self.0
    }
}

/// Structural problems with a year-indexed series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("series has {years} years but {values} values")]
    LengthMismatch { years: usize, values: usize },
    #[error("series years must be strictly increasing (saw {year} after {previous})")]
    NotIncreasing { previous: i32, year: i32 },
}

fn check_years(years: &[i32], values_len: usize) -> Result<(), SeriesError> {
    if years.len() != values_len {
        return Err(SeriesError::LengthMismatch {
            years: years.len(),
            values: values_len,
        });
    }
    for pair in years.windows(2) {
        if pair[1] <= pair[0] {
            return Err(SeriesError::NotIncreasing {
                previous: pair[0],
                year: pair[1],
            });
        }
    }
    Ok(())
}

/// A year-indexed series where a year may carry no value.
///
/// Years are strictly increasing; construction rejects anything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    years: Vec<i32>,
    values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(years: Vec<i32>, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        check_years(&years, values.len())?;
        Ok(Self { years, values })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Value recorded for `year`, if the year is present and non-null.
    pub fn value_at(&self, year: i32) -> Option<f64> {
        let idx = self.years.binary_search(&year).ok()?;
        self.values[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, Option<f64>)> + '_ {
        self.years.iter().copied().zip(self.values.iter().copied())
    }
}

/// Model output beyond the end of the historical data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FutureSeries {
    years: Vec<i32>,
    values: Vec<f64>,
}

impl FutureSeries {
    pub fn new(years: Vec<i32>, values: Vec<f64>) -> Result<Self, SeriesError> {
        check_years(&years, values.len())?;
        Ok(Self { years, values })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn value_at(&self, year: i32) -> Option<f64> {
        let idx = self.years.binary_search(&year).ok()?;
        Some(self.values[idx])
    }
}

/// Accuracy metrics keyed by name (`MAE`, `MSE`, `MAPE`, `R2`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics(BTreeMap<String, f64>);

impl Metrics {
    /// Keys shown first, in this order; anything else follows alphabetically.
    const PREFERRED_ORDER: [&'static str; 4] = ["MAE", "MSE", "MAPE", "R2"];

    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in display order.
    pub fn ordered(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = Self::PREFERRED_ORDER
            .iter()
            .filter_map(|key| self.0.get_key_value(*key))
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        out.extend(
            self.0
                .iter()
                .filter(|(k, _)| !Self::PREFERRED_ORDER.contains(&k.as_str()))
                .map(|(k, v)| (k.as_str(), *v)),
        );
        out
    }
}

/// A classified training submission.
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub files: RoleFiles,
    pub model: ModelVariant,
    pub params: TrainParams,
}

/// A classified future-forecast submission.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub files: RoleFiles,
    pub model: ModelVariant,
    pub horizon: Horizon,
}

/// Output of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    pub metrics: Metrics,
    /// Observed values, including the holdout years.
    pub historical: Series,
    /// Model output over the holdout window.
    pub test_prediction: Series,
}

/// Persisted historical/test predictions for an already-trained model.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPredictions {
    pub historical: Series,
    pub prediction: Series,
}
