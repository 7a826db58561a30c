//! Registry of the model variants the forecasting service can train.
//!
//! Every identifier is listed explicitly with the series it forecasts; the
//! target is never guessed from the shape of the identifier.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::domain::TargetSeries;
use crate::error::UnknownModelError;

/// A known model variant. `id()` is the identifier sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ModelVariant {
    #[value(name = "sarimax")]
    Sarimax,
    #[value(name = "prophet")]
    Prophet,
    #[value(name = "xgb")]
    Xgb,
    #[value(name = "cat")]
    Cat,
    #[value(name = "sarimax_pop")]
    SarimaxPop,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 5] = [
        ModelVariant::Sarimax,
        ModelVariant::Prophet,
        ModelVariant::Xgb,
        ModelVariant::Cat,
        ModelVariant::SarimaxPop,
    ];

    /// The single population-target model, used to fill the secondary chart.
    pub const POPULATION: ModelVariant = ModelVariant::SarimaxPop;

    pub fn id(self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "sarimax",
            ModelVariant::Prophet => "prophet",
            ModelVariant::Xgb => "xgb",
            ModelVariant::Cat => "cat",
            ModelVariant::SarimaxPop => "sarimax_pop",
        }
    }

    pub fn target(self) -> TargetSeries {
        match self {
            ModelVariant::Sarimax | ModelVariant::Prophet | ModelVariant::Xgb | ModelVariant::Cat => {
                TargetSeries::Births
            }
            ModelVariant::SarimaxPop => TargetSeries::Population,
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_label(self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "SARIMAX",
            ModelVariant::Prophet => "Prophet",
            ModelVariant::Xgb => "XGBoost",
            ModelVariant::Cat => "CatBoost",
            ModelVariant::SarimaxPop => "SARIMAX (population)",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelVariant {
    type Err = UnknownModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelVariant::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| UnknownModelError { id: s.to_string() })
    }
}

/// Target series forecast by the model with wire identifier `model_id`.
pub fn resolve_target(model_id: &str) -> Result<TargetSeries, UnknownModelError> {
    model_id.parse::<ModelVariant>().map(ModelVariant::target)
}

/// Display label for the model with wire identifier `model_id`.
pub fn label(model_id: &str) -> Result<&'static str, UnknownModelError> {
    model_id.parse::<ModelVariant>().map(ModelVariant::display_label)
}
