//! Error types for MediGraph

use thiserror::Error;

use crate::types::{CategoryId, Marker};

/// Errors raised by the store, configuration and encoding layers.
///
/// The threshold evaluator and the aging model never fail; these errors only
/// cover structural mistakes such as editing a marker in the wrong category.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Unknown category id: {0}")]
    UnknownCategory(String),

    #[error("Unknown reading name: {0}")]
    UnknownMarker(String),

    #[error("Category not present in store: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Reading {marker} does not belong to category {category}")]
    MarkerMismatch { category: CategoryId, marker: Marker },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
