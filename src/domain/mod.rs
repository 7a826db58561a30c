//! Domain types used throughout the workflow.
//!
//! This module defines:
//!
//! - submission inputs (`UploadedFile`, `FileRole`, `RoleFiles`, `Horizon`)
//! - year-indexed series (`Series`, `FutureSeries`)
//! - service outputs (`TrainResult`, `Metrics`, `StoredPredictions`)

pub mod types;

pub use types::*;
