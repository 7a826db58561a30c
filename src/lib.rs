//! `demo-forecast` library crate.
//!
//! Orchestration core for a demographic forecasting service: it classifies
//! uploaded CSVs, drives the train/forecast workflow against the service, and
//! reconciles the returned series into per-target display timelines.
//!
//! The binary (`dfc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without a live service
//! - the workflow is reusable from other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod models;
pub mod report;
pub mod workflow;
