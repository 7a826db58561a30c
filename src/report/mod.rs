//! Reporting: reconciling series for display and formatting terminal output.

pub mod format;
pub mod reconcile;

pub use format::*;
pub use reconcile::*;
