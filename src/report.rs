//! Report encoding
//!
//! Encodes a store into a self-describing JSON report: producer metadata,
//! derived age figures and every category with its violated rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::store::MetricStore;
use crate::thresholds;
use crate::types::{CategoryId, Marker, Status};
use crate::{MEDIGRAPH_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub chronological_age: u32,
    pub metabolic_age: f64,
    pub aging_factor: f64,
    pub difference_years: u32,
    pub younger: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationReport {
    pub marker: Marker,
    pub value: f64,
    /// Healthy range, e.g. `< 116`
    pub reference: String,
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub id: CategoryId,
    pub title: String,
    pub status: Status,
    pub readings: BTreeMap<Marker, f64>,
    pub violations: Vec<ViolationReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub profile: ProfileReport,
    pub categories: Vec<CategoryReport>,
}

/// Report encoder with a stable instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, store: &MetricStore) -> DashboardReport {
        self.encode_at(store, Utc::now())
    }

    fn encode_at(&self, store: &MetricStore, computed_at: DateTime<Utc>) -> DashboardReport {
        let comparison = store.age_comparison();

        let profile = ProfileReport {
            chronological_age: comparison.chronological_age,
            metabolic_age: comparison.metabolic_age,
            aging_factor: round_factor(store.aging_factor()),
            difference_years: comparison.difference_years,
            younger: comparison.younger,
        };

        let categories = store
            .categories()
            .iter()
            .map(|category| CategoryReport {
                id: category.id,
                title: category.title.clone(),
                status: category.status,
                readings: category.readings.iter().collect(),
                violations: thresholds::violations(category.id, &category.readings)
                    .into_iter()
                    .map(|v| ViolationReport {
                        marker: v.marker,
                        value: v.value,
                        reference: v.limit.to_string(),
                        fallback: v.fallback,
                    })
                    .collect(),
            })
            .collect();

        DashboardReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: MEDIGRAPH_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: computed_at.to_rfc3339(),
            profile,
            categories,
        }
    }

    pub fn encode_to_json(&self, store: &MetricStore) -> Result<String, ComputeError> {
        let report = self.encode(store);
        serde_json::to_string_pretty(&report)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

// Tier deltas carry two decimals at most
fn round_factor(factor: f64) -> f64 {
    (factor * 10_000.0).round() / 10_000.0
}
