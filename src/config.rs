//! Service configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory:
//!
//! - `DEMO_FORECAST_URL`: base URL of the forecasting service
//! - `DEMO_FORECAST_TIMEOUT_SECS`: per-request timeout (training can take minutes)

use std::time::Duration;

use crate::error::AppError;

pub const URL_VAR: &str = "DEMO_FORECAST_URL";
pub const TIMEOUT_VAR: &str = "DEMO_FORECAST_TIMEOUT_SECS";

const DEFAULT_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_values(std::env::var(URL_VAR).ok(), std::env::var(TIMEOUT_VAR).ok())
    }

    /// Build a config from raw (possibly absent) values.
    pub fn from_values(url: Option<String>, timeout_secs: Option<String>) -> Result<Self, AppError> {
        let base_url = normalize_url(url.as_deref().unwrap_or(DEFAULT_URL))?;

        let timeout = match timeout_secs.as_deref().map(str::trim) {
            None | Some("") => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    AppError::new(2, format!("{TIMEOUT_VAR} must be a whole number of seconds (got '{raw}')."))
                })?;
                if secs == 0 {
                    return Err(AppError::new(2, format!("{TIMEOUT_VAR} must be > 0.")));
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self { base_url, timeout })
    }

    /// Replace the base URL (e.g. from a `--url` flag).
    pub fn with_base_url(self, url: &str) -> Result<Self, AppError> {
        Ok(Self {
            base_url: normalize_url(url)?,
            ..self
        })
    }
}

fn normalize_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AppError::new(
            2,
            format!("Service URL must start with http:// or https:// (got '{raw}')."),
        ));
    }
    Ok(trimmed.to_string())
}
