//! Input/output helpers.
//!
//! - reconciled chart exports (CSV) (`export`)

pub mod export;

pub use export::*;
