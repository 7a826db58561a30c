//! HTTP client for the external forecasting service.
//!
//! Endpoints:
//! - `POST /upload-train/`       train on uploaded CSVs, returns metrics + series
//! - `POST /forecast/`           future forecast from uploaded CSVs
//! - `GET  /metrics/{model}`     persisted metrics
//! - `GET  /preds/{model}`       persisted historical/test predictions
//! - `GET  /forecast/{model}`    persisted future forecast (`?years=N`)
//!
//! The service reports failures as `{"status": "error", "detail": ...}`, often
//! with a 200 status, so every body is checked for that shape before decoding.
//! All failures, transport or otherwise, come back as `BackendError`.

use std::collections::BTreeMap;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::domain::{
    ForecastRequest, FutureSeries, Horizon, Metrics, RoleFiles, Series, StoredPredictions,
    TargetSeries, TrainRequest, TrainResult,
};
use crate::error::{AppError, BackendError};
use crate::models::ModelVariant;

/// Operations the workflow needs from the forecasting service.
///
/// Implemented over HTTP by `ServiceClient`; tests substitute an in-memory fake.
pub trait ForecastBackend: Send + Sync {
    fn train(&self, request: &TrainRequest) -> Result<TrainResult, BackendError>;
    fn forecast(&self, request: &ForecastRequest) -> Result<FutureSeries, BackendError>;
    fn metrics(&self, model: ModelVariant) -> Result<Metrics, BackendError>;
    fn predictions(&self, model: ModelVariant) -> Result<StoredPredictions, BackendError>;
    fn stored_forecast(&self, model: ModelVariant, horizon: Horizon) -> Result<FutureSeries, BackendError>;
}

pub struct ServiceClient {
    client: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Value, BackendError> {
        let resp = req
            .send()
            .map_err(|e| BackendError::new(format!("{what} request failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| BackendError::new(format!("Failed to read {what} response: {e}")))?;

        let body: Option<Value> = serde_json::from_str(&text).ok();
        if !status.is_success() {
            // Prefer the service's own explanation when it sent one.
            let detail = body
                .as_ref()
                .and_then(|b| b.get("detail"))
                .map(detail_text)
                .unwrap_or_else(|| format!("{what} request failed with status {status}."));
            return Err(BackendError::new(detail));
        }

        let body = body.ok_or_else(|| BackendError::new(format!("{what} response is not valid JSON.")))?;
        check_error_payload(body)
    }

    fn multipart_form(files: &RoleFiles, model: ModelVariant) -> Result<Form, BackendError> {
        let mut form = Form::new().text("model", model.id());
        for (role, file) in files.iter() {
            let part = Part::bytes(file.content.clone())
                .file_name(file.name.clone())
                .mime_str("text/csv")
                .map_err(|e| BackendError::new(format!("Failed to attach {role} file: {e}")))?;
            form = form.part(role.field_name(), part);
        }
        Ok(form)
    }
}

impl ForecastBackend for ServiceClient {
    fn train(&self, request: &TrainRequest) -> Result<TrainResult, BackendError> {
        let mut form = Self::multipart_form(&request.files, request.model)?;
        for (key, value) in &request.params {
            form = form.text(key.clone(), value.clone());
        }

        let url = self.url("/upload-train/");
        tracing::info!("training {} via {url}", request.model);
        let body = self.send(self.client.post(&url).multipart(form), "Training")?;
        decode_train(body)
    }

    fn forecast(&self, request: &ForecastRequest) -> Result<FutureSeries, BackendError> {
        let form = Self::multipart_form(&request.files, request.model)?
            .text("years", request.horizon.years().to_string());

        let url = self.url("/forecast/");
        tracing::info!(
            "forecasting {} for {} years via {url}",
            request.model,
            request.horizon.years()
        );
        let body = self.send(self.client.post(&url).multipart(form), "Forecast")?;
        decode_future(body)
    }

    fn metrics(&self, model: ModelVariant) -> Result<Metrics, BackendError> {
        let url = self.url(&format!("/metrics/{}", model.id()));
        tracing::debug!("GET {url}");
        let body = self.send(self.client.get(&url), "Metrics")?;
        decode_metrics(body, Some(model.target()))
    }

    fn predictions(&self, model: ModelVariant) -> Result<StoredPredictions, BackendError> {
        let url = self.url(&format!("/preds/{}", model.id()));
        tracing::debug!("GET {url}");
        let body = self.send(self.client.get(&url), "Predictions")?;
        decode_predictions(body)
    }

    fn stored_forecast(&self, model: ModelVariant, horizon: Horizon) -> Result<FutureSeries, BackendError> {
        let url = self.url(&format!("/forecast/{}", model.id()));
        tracing::debug!("GET {url}?years={}", horizon.years());
        let req = self
            .client
            .get(&url)
            .query(&[("years", horizon.years().to_string())]);
        let body = self.send(req, "Forecast")?;
        decode_future(body)
    }
}

/// Reject the service's `{"status": "error"}` shape; pass anything else through.
pub fn check_error_payload(body: Value) -> Result<Value, BackendError> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let detail = body
            .get("detail")
            .map(detail_text)
            .unwrap_or_else(|| "Backend error".to_string());
        return Err(BackendError::new(detail));
    }
    Ok(body)
}

fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct TrainResponse {
    metrics: BTreeMap<String, Value>,
    hist: HistWire,
    test: TestWire,
}

#[derive(Debug, Deserialize)]
struct HistWire {
    #[serde(rename = "Year")]
    year: Vec<f64>,
    #[serde(rename = "Value")]
    value: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct TestWire {
    #[serde(rename = "Year")]
    year: Vec<f64>,
    y_true: Vec<Option<f64>>,
    y_pred: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct FutureWire {
    #[serde(rename = "Year")]
    year: Vec<f64>,
    y_pred: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PredsWire {
    #[serde(rename = "Year")]
    year: Vec<f64>,
    y_hist: Vec<Option<f64>>,
    y_pred: Vec<Option<f64>>,
}

fn from_body<T: DeserializeOwned>(body: Value, what: &str) -> Result<T, BackendError> {
    serde_json::from_value(body).map_err(|e| BackendError::new(format!("Malformed {what} response: {e}")))
}

/// Years arrive as JSON numbers; pandas occasionally emits them as floats.
fn to_years(raw: &[f64]) -> Result<Vec<i32>, BackendError> {
    raw.iter()
        .map(|&y| {
            if y.fract() == 0.0 && y >= f64::from(i32::MIN) && y <= f64::from(i32::MAX) {
                Ok(y as i32)
            } else {
                Err(BackendError::new(format!("Invalid year {y} in service response.")))
            }
        })
        .collect()
}

fn series(years: &[f64], values: Vec<Option<f64>>, what: &str) -> Result<Series, BackendError> {
    Series::new(to_years(years)?, values)
        .map_err(|e| BackendError::new(format!("Malformed {what} series: {e}")))
}

pub fn decode_train(body: Value) -> Result<TrainResult, BackendError> {
    let resp: TrainResponse = from_body(check_error_payload(body)?, "training")?;

    if resp.test.y_true.len() != resp.test.year.len() {
        return Err(BackendError::new(format!(
            "Malformed test series: {} years but {} actual values",
            resp.test.year.len(),
            resp.test.y_true.len()
        )));
    }

    let test_years = to_years(&resp.test.year)?;
    let hist_years = to_years(&resp.hist.year)?;
    if hist_years.len() != resp.hist.value.len() {
        return Err(BackendError::new(format!(
            "Malformed historical series: {} years but {} values",
            hist_years.len(),
            resp.hist.value.len()
        )));
    }

    // Observed values over the holdout fill in years the history lacks.
    let mut actuals: BTreeMap<i32, Option<f64>> = hist_years.iter().copied().zip(resp.hist.value).collect();
    for (year, value) in test_years.iter().copied().zip(resp.test.y_true) {
        let slot = actuals.entry(year).or_insert(None);
        if slot.is_none() {
            *slot = value;
        }
    }
    let (years, values): (Vec<i32>, Vec<Option<f64>>) = actuals.into_iter().unzip();
    let historical = Series::new(years, values)
        .map_err(|e| BackendError::new(format!("Malformed historical series: {e}")))?;

    let test_prediction = series(&resp.test.year, resp.test.y_pred, "test")?;

    Ok(TrainResult {
        metrics: metrics_from_map(resp.metrics, None),
        historical,
        test_prediction,
    })
}

pub fn decode_future(body: Value) -> Result<FutureSeries, BackendError> {
    let resp: FutureWire = from_body(check_error_payload(body)?, "forecast")?;
    FutureSeries::new(to_years(&resp.year)?, resp.y_pred)
        .map_err(|e| BackendError::new(format!("Malformed forecast series: {e}")))
}

pub fn decode_predictions(body: Value) -> Result<StoredPredictions, BackendError> {
    let resp: PredsWire = from_body(check_error_payload(body)?, "predictions")?;
    Ok(StoredPredictions {
        historical: series(&resp.year, resp.y_hist, "historical")?,
        prediction: series(&resp.year, resp.y_pred, "prediction")?,
    })
}

/// Decode a metrics body. `expected` is cross-checked against a `Target` column.
pub fn decode_metrics(body: Value, expected: Option<TargetSeries>) -> Result<Metrics, BackendError> {
    let map: BTreeMap<String, Value> = from_body(check_error_payload(body)?, "metrics")?;
    Ok(metrics_from_map(map, expected))
}

fn metrics_from_map(map: BTreeMap<String, Value>, expected: Option<TargetSeries>) -> Metrics {
    let mut values = BTreeMap::new();
    for (key, value) in map {
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_f64() {
                    values.insert(key, v);
                }
            }
            Value::String(target) if key == "Target" => {
                if let Some(expected) = expected {
                    if target != expected.display_name() {
                        tracing::warn!(
                            "service reports target '{target}', catalog expects '{}'",
                            expected.display_name()
                        );
                    }
                }
            }
            _ => {}
        }
    }
    Metrics::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payload_is_detected_on_any_endpoint() {
        let body = json!({"status": "error", "detail": "model not found"});
        assert_eq!(
            decode_metrics(body.clone(), None).unwrap_err(),
            BackendError::new("model not found")
        );
        assert_eq!(decode_future(body.clone()).unwrap_err().detail, "model not found");
        assert_eq!(decode_predictions(body.clone()).unwrap_err().detail, "model not found");
        assert_eq!(decode_train(body).unwrap_err().detail, "model not found");

        let no_detail = json!({"status": "error"});
        assert_eq!(check_error_payload(no_detail).unwrap_err().detail, "Backend error");
    }

    #[test]
    fn ok_status_is_not_an_error() {
        let body = json!({"status": "ok", "MAE": 1.5});
        let metrics = decode_metrics(body, None).unwrap();
        assert_eq!(metrics.get("MAE"), Some(1.5));
    }

    #[test]
    fn train_response_merges_holdout_actuals_into_history() {
        let body = json!({
            "metrics": {"MAE": 120.5, "MAPE": 2.25},
            "hist": {"Year": [2019, 2020, 2021], "Value": [10.0, 11.0, 12.0]},
            "test": {"Year": [2022, 2023], "y_true": [13.0, 14.0], "y_pred": [12.5, 13.2]}
        });
        let result = decode_train(body).unwrap();
        assert_eq!(result.historical.years(), &[2019, 2020, 2021, 2022, 2023]);
        assert_eq!(result.historical.value_at(2023), Some(14.0));
        assert_eq!(result.test_prediction.years(), &[2022, 2023]);
        assert_eq!(result.test_prediction.value_at(2022), Some(12.5));
        assert_eq!(result.metrics.get("MAPE"), Some(2.25));
    }

    #[test]
    fn history_wins_where_both_sources_have_a_value() {
        let body = json!({
            "metrics": {},
            "hist": {"Year": [2021, 2022], "Value": [1.0, null]},
            "test": {"Year": [2021, 2022], "y_true": [9.0, 2.0], "y_pred": [1.1, 2.1]}
        });
        let result = decode_train(body).unwrap();
        assert_eq!(result.historical.value_at(2021), Some(1.0));
        assert_eq!(result.historical.value_at(2022), Some(2.0));
    }

    #[test]
    fn predictions_keep_null_gaps() {
        let body = json!({
            "Year": [2020.0, 2021.0, 2022.0],
            "y_hist": [5.0, 6.0, null],
            "y_pred": [null, 6.1, 7.0]
        });
        let preds = decode_predictions(body).unwrap();
        assert_eq!(preds.historical.values(), &[Some(5.0), Some(6.0), None]);
        assert_eq!(preds.prediction.value_at(2020), None);
        assert_eq!(preds.prediction.value_at(2022), Some(7.0));
    }

    #[test]
    fn metrics_skip_non_numeric_columns() {
        let body = json!({"MAE": 1.0, "MSE": 2.0, "MAPE": 3.0, "R2": 0.5, "Target": "Births"});
        let metrics = decode_metrics(body, Some(TargetSeries::Births)).unwrap();
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics.get("Target"), None);
    }

    #[test]
    fn malformed_bodies_become_backend_errors() {
        assert!(decode_future(json!({"Year": [2030, 2031], "y_pred": [1.0]})).is_err());
        assert!(decode_future(json!({"Year": [2031, 2030], "y_pred": [1.0, 2.0]})).is_err());
        assert!(decode_future(json!({"Year": [2030.5], "y_pred": [1.0]})).is_err());
        assert!(decode_future(json!({"Year": [2030], "y_pred": [null]})).is_err());
        assert!(decode_predictions(json!([1, 2, 3])).is_err());
        let err = decode_train(json!({"metrics": {}})).unwrap_err();
        assert!(err.detail.starts_with("Malformed training response"), "{}", err.detail);
    }
}
