//! Merge historical, test-period and future series into one display timeline.
//!
//! The timeline is the sorted union of every source's years. Per year:
//! - `historical` is the observed value, or null
//! - `predicted` is the test-period prediction if there is one, otherwise the
//!   future forecast's value, otherwise null
//!
//! Nothing is interpolated: a null in the output always means the sources had
//! no value for that year.

use std::collections::BTreeSet;

use crate::domain::{FutureSeries, Series, TargetSeries};
use crate::models::ModelVariant;

/// One chart's worth of aligned values.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySeries {
    pub target: TargetSeries,
    pub years: Vec<i32>,
    pub historical: Vec<Option<f64>>,
    pub predicted: Vec<Option<f64>>,
    /// Last observed year before predictions start (annotation only).
    pub split_year: Option<i32>,
}

impl DisplaySeries {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, Option<f64>, Option<f64>)> + '_ {
        self.years
            .iter()
            .zip(&self.historical)
            .zip(&self.predicted)
            .map(|((y, h), p)| (*y, *h, *p))
    }
}

pub fn reconcile(
    target: TargetSeries,
    historical: &Series,
    test_prediction: &Series,
    future: Option<&FutureSeries>,
) -> DisplaySeries {
    let mut all_years: BTreeSet<i32> = BTreeSet::new();
    all_years.extend(historical.years());
    all_years.extend(test_prediction.years());
    if let Some(future) = future {
        all_years.extend(future.years());
    }

    let years: Vec<i32> = all_years.into_iter().collect();
    let hist: Vec<Option<f64>> = years.iter().map(|&y| historical.value_at(y)).collect();
    let predicted: Vec<Option<f64>> = years
        .iter()
        .map(|&y| {
            test_prediction
                .value_at(y)
                .or_else(|| future.and_then(|f| f.value_at(y)))
        })
        .collect();

    let split_year = split_year(&years, &hist, &predicted);

    DisplaySeries {
        target,
        years,
        historical: hist,
        predicted,
        split_year,
    }
}

fn split_year(years: &[i32], historical: &[Option<f64>], predicted: &[Option<f64>]) -> Option<i32> {
    let first_pred = years
        .iter()
        .zip(predicted)
        .find(|(_, p)| p.is_some())
        .map(|(y, _)| *y)?;
    years
        .iter()
        .zip(historical)
        .filter(|(y, h)| **y < first_pred && h.is_some())
        .map(|(y, _)| *y)
        .last()
}

/// Which model feeds each chart for a given selection.
///
/// The births chart shows the selected model when it forecasts births. The
/// population chart always has a source: the selected model when it is the
/// population model, else the fixed population model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPlan {
    pub births: Option<ModelVariant>,
    pub population: ModelVariant,
}

impl ChartPlan {
    pub fn for_selection(selected: ModelVariant) -> Self {
        match selected.target() {
            TargetSeries::Births => Self {
                births: Some(selected),
                population: ModelVariant::POPULATION,
            },
            TargetSeries::Population => Self {
                births: None,
                population: selected,
            },
        }
    }

    /// Whether the `target` chart shows the workflow's own trained data.
    pub fn uses_trained(&self, target: TargetSeries, selected: ModelVariant) -> bool {
        match target {
            TargetSeries::Births => self.births == Some(selected),
            TargetSeries::Population => self.population == selected,
        }
    }
}
