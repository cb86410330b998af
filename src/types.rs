//! Core types for MediGraph
//!
//! This module defines the data that flows through the engine: category
//! identifiers, reading names (markers), sparse reading sets, categories and
//! the user profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;

/// Minimum chronological age accepted anywhere in the engine
pub const MIN_AGE: u32 = 18;

/// Biomarker domain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Cardio,
    Inflammation,
    Energy,
    Muscle,
    Renal,
}

impl CategoryId {
    /// All categories in dashboard order
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Cardio,
        CategoryId::Inflammation,
        CategoryId::Energy,
        CategoryId::Muscle,
        CategoryId::Renal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::Cardio => "cardio",
            CategoryId::Inflammation => "inflammation",
            CategoryId::Energy => "energy",
            CategoryId::Muscle => "muscle",
            CategoryId::Renal => "renal",
        }
    }

    /// Parse a string id; unrecognized ids yield `None`
    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }

    /// Default display title
    pub fn title(&self) -> &'static str {
        match self {
            CategoryId::Cardio => "Cardiovascular Health",
            CategoryId::Inflammation => "Inflammation",
            CategoryId::Energy => "Energy Metabolism",
            CategoryId::Muscle => "Muscle Mass",
            CategoryId::Renal => "Renal Function",
        }
    }

    /// Icon hint for hosts that render the dashboard
    pub fn icon_name(&self) -> &'static str {
        match self {
            CategoryId::Cardio => "Heart",
            CategoryId::Inflammation => "Flame",
            CategoryId::Energy => "Zap",
            CategoryId::Muscle => "BicepsFlexed",
            CategoryId::Renal => "Droplets",
        }
    }

    /// Markers editable for this category, in form order
    pub fn markers(&self) -> impl Iterator<Item = Marker> {
        let id = *self;
        Marker::ALL.into_iter().filter(move |m| m.category() == id)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ComputeError::UnknownCategory(s.to_string()))
    }
}

/// Category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Good,
    Alert,
    #[default]
    Neutral,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Good => "good",
            Status::Alert => "alert",
            Status::Neutral => "neutral",
        }
    }

    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Status::Good => "Optimal",
            Status::Alert => "Alert",
            Status::Neutral => "Stable",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named biomarker reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Marker {
    // Cardio
    CholesterolTotal,
    LdlCholesterol,
    HdlCholesterol,
    Triglycerides,
    LdlParticles,
    LdlSize,
    // Inflammation
    GlycA,
    GlycB,
    InflammationScore,
    // Energy
    Glucose,
    Lactate,
    Ketones,
    Acetone,
    Tyrosine,
    Alanine,
    // Muscle
    Valine,
    Leucine,
    Isoleucine,
    Glutamine,
    Glutamate,
    Creatine,
    ProteinSynthesis,
    // Renal
    Creatinine,
    Gfr,
}

impl Marker {
    pub const ALL: [Marker; 24] = [
        Marker::CholesterolTotal,
        Marker::LdlCholesterol,
        Marker::HdlCholesterol,
        Marker::Triglycerides,
        Marker::LdlParticles,
        Marker::LdlSize,
        Marker::GlycA,
        Marker::GlycB,
        Marker::InflammationScore,
        Marker::Glucose,
        Marker::Lactate,
        Marker::Ketones,
        Marker::Acetone,
        Marker::Tyrosine,
        Marker::Alanine,
        Marker::Valine,
        Marker::Leucine,
        Marker::Isoleucine,
        Marker::Glutamine,
        Marker::Glutamate,
        Marker::Creatine,
        Marker::ProteinSynthesis,
        Marker::Creatinine,
        Marker::Gfr,
    ];

    /// Wire name (camelCase, as used in snapshots)
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::CholesterolTotal => "cholesterolTotal",
            Marker::LdlCholesterol => "ldlCholesterol",
            Marker::HdlCholesterol => "hdlCholesterol",
            Marker::Triglycerides => "triglycerides",
            Marker::LdlParticles => "ldlParticles",
            Marker::LdlSize => "ldlSize",
            Marker::GlycA => "glycA",
            Marker::GlycB => "glycB",
            Marker::InflammationScore => "inflammationScore",
            Marker::Glucose => "glucose",
            Marker::Lactate => "lactate",
            Marker::Ketones => "ketones",
            Marker::Acetone => "acetone",
            Marker::Tyrosine => "tyrosine",
            Marker::Alanine => "alanine",
            Marker::Valine => "valine",
            Marker::Leucine => "leucine",
            Marker::Isoleucine => "isoleucine",
            Marker::Glutamine => "glutamine",
            Marker::Glutamate => "glutamate",
            Marker::Creatine => "creatine",
            Marker::ProteinSynthesis => "proteinSynthesis",
            Marker::Creatinine => "creatinine",
            Marker::Gfr => "gfr",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Category this marker is edited under
    pub fn category(&self) -> CategoryId {
        match self {
            Marker::CholesterolTotal
            | Marker::LdlCholesterol
            | Marker::HdlCholesterol
            | Marker::Triglycerides
            | Marker::LdlParticles
            | Marker::LdlSize => CategoryId::Cardio,
            Marker::GlycA | Marker::GlycB | Marker::InflammationScore => CategoryId::Inflammation,
            Marker::Glucose
            | Marker::Lactate
            | Marker::Ketones
            | Marker::Acetone
            | Marker::Tyrosine
            | Marker::Alanine => CategoryId::Energy,
            Marker::Valine
            | Marker::Leucine
            | Marker::Isoleucine
            | Marker::Glutamine
            | Marker::Glutamate
            | Marker::Creatine
            | Marker::ProteinSynthesis => CategoryId::Muscle,
            Marker::Creatinine | Marker::Gfr => CategoryId::Renal,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Marker::CholesterolTotal => "Total Cholesterol",
            Marker::LdlCholesterol => "LDL Cholesterol",
            Marker::HdlCholesterol => "HDL Cholesterol",
            Marker::Triglycerides => "Triglycerides",
            Marker::LdlParticles => "LDL Particles",
            Marker::LdlSize => "LDL Size",
            Marker::GlycA => "Glyc-A",
            Marker::GlycB => "Glyc-B",
            Marker::InflammationScore => "Inflammation Score",
            Marker::Glucose => "Glucose",
            Marker::Lactate => "Lactate",
            Marker::Ketones => "Ketones 3-HB",
            Marker::Acetone => "Acetone",
            Marker::Tyrosine => "Tyrosine",
            Marker::Alanine => "Alanine",
            Marker::Valine => "Valine",
            Marker::Leucine => "Leucine",
            Marker::Isoleucine => "Isoleucine",
            Marker::Glutamine => "Glutamine",
            Marker::Glutamate => "Glutamate",
            Marker::Creatine => "Creatine",
            Marker::ProteinSynthesis => "Protein Synthesis",
            Marker::Creatinine => "Creatinine",
            Marker::Gfr => "eGFR",
        }
    }

    /// Measurement unit, empty for unitless scores
    pub fn unit(&self) -> &'static str {
        match self {
            Marker::CholesterolTotal
            | Marker::LdlCholesterol
            | Marker::HdlCholesterol
            | Marker::Triglycerides
            | Marker::Glucose => "mg/dL",
            Marker::LdlParticles => "nmol/L",
            Marker::LdlSize => "nm",
            Marker::Gfr => "mL/min",
            Marker::InflammationScore | Marker::ProteinSynthesis => "",
            _ => "µM",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marker {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ComputeError::UnknownMarker(s.to_string()))
    }
}

/// Sparse set of readings for one category.
///
/// Absent keys are absent, not zero: each rule decides its own fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Readings(BTreeMap<Marker, f64>);

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, marker: Marker, value: f64) -> Self {
        self.0.insert(marker, value);
        self
    }

    pub fn get(&self, marker: Marker) -> Option<f64> {
        self.0.get(&marker).copied()
    }

    /// Value of `marker`, or `fallback` when the reading is absent
    pub fn value_or(&self, marker: Marker, fallback: f64) -> f64 {
        self.get(marker).unwrap_or(fallback)
    }

    pub fn set(&mut self, marker: Marker, value: f64) -> Option<f64> {
        self.0.insert(marker, value)
    }

    pub fn remove(&mut self, marker: Marker) -> Option<f64> {
        self.0.remove(&marker)
    }

    pub fn contains(&self, marker: Marker) -> bool {
        self.0.contains_key(&marker)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Marker, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

impl FromIterator<(Marker, f64)> for Readings {
    fn from_iter<I: IntoIterator<Item = (Marker, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One biomarker domain with its current readings and derived status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    /// Derived from `readings`; recomputed by the store on every edit
    #[serde(default)]
    pub status: Status,
    #[serde(default, alias = "details")]
    pub readings: Readings,
}

impl Category {
    /// Create a category with its default title and an unevaluated status
    pub fn new(id: CategoryId, readings: Readings) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            status: Status::Neutral,
            readings,
        }
    }
}

/// User profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Chronological age in years, never below [`MIN_AGE`]
    age: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self { age: 40 }
    }
}

impl Profile {
    /// Create a profile, clamping the age to the minimum
    pub fn new(age: i64) -> Self {
        Self {
            age: clamp_age(age),
        }
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn set_age(&mut self, age: i64) {
        self.age = clamp_age(age);
    }
}

/// Clamp any integer age into the accepted range
pub fn clamp_age(age: i64) -> u32 {
    age.clamp(MIN_AGE as i64, u32::MAX as i64) as u32
}

/// Coerce free-form numeric input to a finite value.
///
/// Empty, non-numeric and non-finite input becomes `0.0`.
pub fn coerce_numeric(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_parse() {
        assert_eq!(CategoryId::parse("cardio"), Some(CategoryId::Cardio));
        assert_eq!(CategoryId::parse("renal"), Some(CategoryId::Renal));
        assert_eq!(CategoryId::parse("Cardio"), None);
        assert_eq!(CategoryId::parse("liver"), None);
        assert!("liver".parse::<CategoryId>().is_err());
    }

    #[test]
    fn test_marker_wire_names_match_serde() {
        for marker in Marker::ALL {
            let json = serde_json::to_string(&marker).unwrap();
            assert_eq!(json, format!("\"{}\"", marker.as_str()));
            assert_eq!(Marker::parse(marker.as_str()), Some(marker));
        }
    }

    #[test]
    fn test_every_category_has_markers() {
        for id in CategoryId::ALL {
            assert!(id.markers().count() >= 2, "{id} has too few markers");
        }
        assert_eq!(
            CategoryId::Renal.markers().collect::<Vec<_>>(),
            vec![Marker::Creatinine, Marker::Gfr]
        );
    }

    #[test]
    fn test_profile_age_floor() {
        assert_eq!(Profile::new(12).age(), 18);
        assert_eq!(Profile::new(-5).age(), 18);
        assert_eq!(Profile::new(52).age(), 52);

        let mut profile = Profile::default();
        profile.set_age(17);
        assert_eq!(profile.age(), 18);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("126"), 126.0);
        assert_eq!(coerce_numeric(" 20.81 "), 20.81);
        assert_eq!(coerce_numeric(""), 0.0);
        assert_eq!(coerce_numeric("abc"), 0.0);
        assert_eq!(coerce_numeric("NaN"), 0.0);
        assert_eq!(coerce_numeric("inf"), 0.0);
    }

    #[test]
    fn test_category_accepts_details_alias() {
        let json = r#"{"id":"renal","title":"Kidneys","details":{"gfr":98.0}}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.id, CategoryId::Renal);
        assert_eq!(category.readings.get(Marker::Gfr), Some(98.0));
        assert_eq!(category.status, Status::Neutral);
    }
}
