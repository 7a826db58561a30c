//! Model catalog.
//!
//! The forecasting itself happens in the external service; this crate only
//! needs to know which identifiers exist and what each one forecasts.

pub mod catalog;

pub use catalog::*;
