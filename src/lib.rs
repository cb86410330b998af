//! MediGraph - Biomarker status and metabolic age engine
//!
//! MediGraph turns a lab panel into dashboard state through deterministic
//! rules: threshold evaluation → category status, aging signals → metabolic
//! age. Advisory text is produced behind an async provider boundary with
//! debouncing and caching for interactive hosts.
//!
//! ## Modules
//!
//! - **Rule engine**: [`thresholds`] and [`aging`], pure and total
//! - **State**: [`store`] owns categories and profile, [`seed`] the startup panel
//! - **Advisory**: [`advisory`] providers and the debounced scheduler
//! - **Output**: [`report`] JSON reports, [`ffi`] C bindings

pub mod advisory;
pub mod aging;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod seed;
pub mod store;
pub mod thresholds;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use advisory::{AdvisoryError, AdvisoryScheduler, AdvisoryTextProvider, LocalAdvisor};
pub use aging::{compute_metabolic_age, AgeComparison};
pub use config::DashboardConfig;
pub use error::ComputeError;
pub use report::ReportEncoder;
pub use store::MetricStore;
pub use thresholds::{evaluate, evaluate_named};
pub use types::{Category, CategoryId, Marker, Readings, Status};

/// Version embedded in every report
pub const MEDIGRAPH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "medigraph";
