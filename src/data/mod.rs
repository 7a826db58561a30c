//! Inputs and the forecasting service.
//!
//! - filename-based role assignment for uploads (`roles`)
//! - the HTTP client and the `ForecastBackend` seam (`service`)

pub mod roles;
pub mod service;

pub use roles::{classify, role_for_name};
pub use service::{ForecastBackend, ServiceClient};
