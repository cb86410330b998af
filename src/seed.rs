//! Startup data set
//!
//! The dashboard starts with one lab panel for a 40 year old. Statuses are
//! never stored here; [`expected_statuses`] exists only so the evaluator can
//! be checked against the panel's published interpretation.

use crate::thresholds;
use crate::types::{Category, CategoryId, Marker, Readings, Status};

/// Chronological age the dashboard starts with
pub const SEED_AGE: u32 = 40;

/// Seed readings for one category
pub fn readings(id: CategoryId) -> Readings {
    match id {
        CategoryId::Cardio => Readings::new()
            .with(Marker::CholesterolTotal, 201.0)
            .with(Marker::LdlCholesterol, 126.0)
            .with(Marker::HdlCholesterol, 62.0)
            .with(Marker::Triglycerides, 58.0)
            .with(Marker::LdlParticles, 1293.0)
            .with(Marker::LdlSize, 20.81),
        CategoryId::Inflammation => Readings::new()
            .with(Marker::GlycA, 526.0)
            .with(Marker::GlycB, 304.0)
            .with(Marker::InflammationScore, 15.0),
        CategoryId::Energy => Readings::new()
            .with(Marker::Glucose, 98.0)
            .with(Marker::Lactate, 202.0)
            .with(Marker::Ketones, 37.0)
            .with(Marker::Acetone, 18.0)
            .with(Marker::Tyrosine, 40.0)
            .with(Marker::Alanine, 351.0),
        CategoryId::Muscle => Readings::new()
            .with(Marker::Valine, 218.0)
            .with(Marker::Leucine, 116.0)
            .with(Marker::Isoleucine, 41.0)
            .with(Marker::Glutamine, 405.0)
            .with(Marker::Glutamate, 124.0)
            .with(Marker::Creatine, 70.0)
            .with(Marker::ProteinSynthesis, 75.0),
        CategoryId::Renal => Readings::new()
            .with(Marker::Creatinine, 45.0)
            .with(Marker::Gfr, 98.0),
    }
}

/// The five seed categories, statuses evaluated
pub fn categories() -> Vec<Category> {
    CategoryId::ALL
        .into_iter()
        .map(|id| {
            let mut category = Category::new(id, readings(id));
            category.status = thresholds::evaluate(id, &category.readings);
            category
        })
        .collect()
}

/// Interpretation published with the seed panel
pub fn expected_statuses() -> [(CategoryId, Status); 5] {
    [
        (CategoryId::Cardio, Status::Alert),
        (CategoryId::Inflammation, Status::Good),
        (CategoryId::Energy, Status::Good),
        (CategoryId::Muscle, Status::Alert),
        (CategoryId::Renal, Status::Good),
    ]
}

/// Categories whose evaluated status disagrees with the published one
pub fn verify() -> Vec<(CategoryId, Status, Status)> {
    expected_statuses()
        .into_iter()
        .filter_map(|(id, expected)| {
            let actual = thresholds::evaluate(id, &readings(id));
            (actual != expected).then_some((id, expected, actual))
        })
        .collect()
}
