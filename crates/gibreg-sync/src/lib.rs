//! Registry reconciliation for gibreg.
//!
//! A sweep reads every registration from a [`RegistrySource`], upserts each
//! one into a [`gibreg_core::store::RegistryStore`], and finally flags the
//! entries the source no longer lists as inactive.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod source;

pub use config::Settings;
pub use error::{Error, Result};
pub use reconcile::{SweepReport, run_sweep};
pub use source::{PartFileSource, RegistrySource, SourceBatch};
