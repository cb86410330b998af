//! Metric store
//!
//! The store owns the category collection and the profile. Every edit
//! re-evaluates the edited category, so a category status always matches
//! its readings. Metabolic age is recomputed on demand, never cached.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aging::{self, AgeComparison};
use crate::error::ComputeError;
use crate::seed;
use crate::thresholds;
use crate::types::{coerce_numeric, Category, CategoryId, Marker, Profile, Status};

/// Serialized form of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub age: i64,
    pub categories: Vec<Category>,
}

/// In-memory owner of categories and profile
#[derive(Debug, Clone)]
pub struct MetricStore {
    categories: Vec<Category>,
    profile: Profile,
    revision: u64,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MetricStore {
    /// Create a store, re-evaluating every category status.
    ///
    /// Supplied statuses that disagree with the evaluator are replaced. Only
    /// the first entry of a repeated category id is kept.
    pub fn new(categories: Vec<Category>, age: i64) -> Self {
        let mut kept: Vec<Category> = Vec::with_capacity(categories.len());
        for category in categories {
            if kept.iter().any(|c| c.id == category.id) {
                warn!(category = %category.id, "duplicate category dropped");
                continue;
            }
            kept.push(reconcile(category));
        }
        Self {
            categories: kept,
            profile: Profile::new(age),
            revision: 0,
        }
    }

    /// Store holding the startup panel
    pub fn seeded() -> Self {
        Self::new(seed::categories(), seed::SEED_AGE as i64)
    }

    /// Load a store from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self::new(snapshot.categories, snapshot.age)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            age: self.profile.age() as i64,
            categories: self.categories.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(ComputeError::JsonError)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn age(&self) -> u32 {
        self.profile.age()
    }

    /// Mutation counter, bumped on every edit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Write a reading and return the category's new status.
    ///
    /// Non-finite values are stored as `0.0`.
    pub fn set_reading(
        &mut self,
        id: CategoryId,
        marker: Marker,
        value: f64,
    ) -> Result<Status, ComputeError> {
        if marker.category() != id {
            return Err(ComputeError::MarkerMismatch {
                category: id,
                marker,
            });
        }
        let value = if value.is_finite() { value } else { 0.0 };

        let category = self.category_mut(id)?;
        category.readings.set(marker, value);
        let status = refresh_status(category);

        self.revision += 1;
        debug!(category = %id, marker = %marker, value, status = %status, "reading updated");
        Ok(status)
    }

    /// Write a reading from form text; unparseable input becomes `0.0`
    pub fn set_reading_input(
        &mut self,
        id: CategoryId,
        marker: Marker,
        raw: &str,
    ) -> Result<Status, ComputeError> {
        self.set_reading(id, marker, coerce_numeric(raw))
    }

    /// Remove a reading so its rule falls back to the default
    pub fn clear_reading(
        &mut self,
        id: CategoryId,
        marker: Marker,
    ) -> Result<Status, ComputeError> {
        let category = self.category_mut(id)?;
        category.readings.remove(marker);
        let status = refresh_status(category);

        self.revision += 1;
        debug!(category = %id, marker = %marker, status = %status, "reading cleared");
        Ok(status)
    }

    pub fn set_title(
        &mut self,
        id: CategoryId,
        title: impl Into<String>,
    ) -> Result<(), ComputeError> {
        self.category_mut(id)?.title = title.into();
        self.revision += 1;
        Ok(())
    }

    /// Set the chronological age, clamped to the minimum
    pub fn set_age(&mut self, age: i64) -> u32 {
        self.profile.set_age(age);
        self.revision += 1;
        debug!(age = self.profile.age(), "age updated");
        self.profile.age()
    }

    /// Set the age from form text
    pub fn set_age_input(&mut self, raw: &str) -> u32 {
        let age = coerce_numeric(raw).trunc();
        self.set_age(age as i64)
    }

    pub fn aging_factor(&self) -> f64 {
        aging::aging_factor(&self.categories)
    }

    pub fn metabolic_age(&self) -> f64 {
        aging::compute_metabolic_age(self.profile.age() as i64, &self.categories)
    }

    pub fn age_comparison(&self) -> AgeComparison {
        AgeComparison::new(self.profile.age(), self.metabolic_age())
    }

    /// Statuses concatenated in category order
    pub fn status_vector(&self) -> String {
        self.categories.iter().map(|c| c.status.as_str()).collect()
    }

    /// Categories currently in alert
    pub fn alerts(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.status == Status::Alert)
    }

    fn category_mut(&mut self, id: CategoryId) -> Result<&mut Category, ComputeError> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ComputeError::CategoryNotFound(id))
    }
}

fn refresh_status(category: &mut Category) -> Status {
    category.status = thresholds::evaluate(category.id, &category.readings);
    category.status
}

fn reconcile(mut category: Category) -> Category {
    let supplied = category.status;
    let evaluated = refresh_status(&mut category);
    if supplied != Status::Neutral && supplied != evaluated {
        warn!(
            category = %category.id,
            supplied = %supplied,
            evaluated = %evaluated,
            "supplied status disagrees with readings, using evaluated status"
        );
    }
    category
}
