//! Metabolic age model
//!
//! Metabolic age scales the chronological age by an aging factor. The factor
//! starts at 1.0 and accumulates a fixed delta from every signal whose tier
//! matches. Tiers of one signal are checked in order and the first match
//! wins, so coarser thresholds are listed before finer ones.
//!
//! Unlike threshold rules, a signal reads a stored `0` as missing: a cleared
//! form field takes the signal's fallback instead of firing its low tier.

use serde::Serialize;

use crate::types::{clamp_age, Category, CategoryId, Marker, Readings, MIN_AGE};

/// Nominal aging rate
pub const BASE_AGING_FACTOR: f64 = 1.0;

/// Tier condition on a single reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Above(f64),
    Below(f64),
    /// Strictly between both bounds
    Between(f64, f64),
}

impl Trigger {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Trigger::Above(limit) => value > limit,
            Trigger::Below(limit) => value < limit,
            Trigger::Between(low, high) => value > low && value < high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub trigger: Trigger,
    pub delta: f64,
}

const fn tier(trigger: Trigger, delta: f64) -> Tier {
    Tier { trigger, delta }
}

/// A reading that moves the aging factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgingSignal {
    pub category: CategoryId,
    pub marker: Marker,
    pub fallback: f64,
    pub tiers: &'static [Tier],
}

impl AgingSignal {
    /// Value the tiers are checked against; absent or zero takes the fallback
    pub fn value(&self, readings: &Readings) -> f64 {
        readings
            .get(self.marker)
            .filter(|v| *v != 0.0)
            .unwrap_or(self.fallback)
    }

    /// Delta of the first matching tier, or zero
    pub fn delta(&self, readings: &Readings) -> f64 {
        let value = self.value(readings);
        self.tiers
            .iter()
            .find(|t| t.trigger.matches(value))
            .map(|t| t.delta)
            .unwrap_or(0.0)
    }
}

pub const SIGNALS: &[AgingSignal] = &[
    AgingSignal {
        category: CategoryId::Cardio,
        marker: Marker::LdlParticles,
        fallback: 0.0,
        tiers: &[
            tier(Trigger::Above(1400.0), 0.04),
            tier(Trigger::Above(1150.0), 0.02),
            tier(Trigger::Below(1000.0), -0.02),
        ],
    },
    AgingSignal {
        category: CategoryId::Cardio,
        marker: Marker::LdlSize,
        fallback: 22.0,
        tiers: &[
            tier(Trigger::Below(20.91), 0.04),
            tier(Trigger::Above(21.5), -0.01),
        ],
    },
    AgingSignal {
        category: CategoryId::Cardio,
        marker: Marker::Triglycerides,
        fallback: 0.0,
        tiers: &[
            tier(Trigger::Above(150.0), 0.02),
            tier(Trigger::Below(90.0), -0.01),
        ],
    },
    AgingSignal {
        category: CategoryId::Inflammation,
        marker: Marker::GlycA,
        fallback: 0.0,
        tiers: &[
            tier(Trigger::Above(600.0), 0.05),
            tier(Trigger::Above(450.0), 0.02),
            tier(Trigger::Below(380.0), -0.03),
        ],
    },
    AgingSignal {
        category: CategoryId::Energy,
        marker: Marker::Glucose,
        fallback: 0.0,
        tiers: &[
            tier(Trigger::Above(105.0), 0.04),
            tier(Trigger::Above(95.0), 0.02),
            tier(Trigger::Between(70.0, 90.0), -0.02),
        ],
    },
    AgingSignal {
        category: CategoryId::Energy,
        marker: Marker::Lactate,
        fallback: 0.0,
        tiers: &[tier(Trigger::Above(550.0), 0.01)],
    },
    AgingSignal {
        category: CategoryId::Muscle,
        marker: Marker::Leucine,
        fallback: 0.0,
        tiers: &[
            tier(Trigger::Below(75.0), 0.03),
            tier(Trigger::Above(110.0), -0.03),
        ],
    },
    AgingSignal {
        category: CategoryId::Renal,
        marker: Marker::Gfr,
        fallback: 100.0,
        tiers: &[
            tier(Trigger::Below(75.0), 0.04),
            tier(Trigger::Above(95.0), -0.01),
        ],
    },
];

/// Signals read from a category
pub fn signals_for(category: CategoryId) -> impl Iterator<Item = &'static AgingSignal> {
    SIGNALS.iter().filter(move |s| s.category == category)
}

/// Sum of deltas contributed by one category
pub fn category_delta(category: &Category) -> f64 {
    signals_for(category.id)
        .map(|s| s.delta(&category.readings))
        .sum()
}

/// Aging factor accumulated over every category present
pub fn aging_factor<'a, I>(categories: I) -> f64
where
    I: IntoIterator<Item = &'a Category>,
{
    let mut factor = BASE_AGING_FACTOR;
    for category in categories {
        for signal in signals_for(category.id) {
            factor += signal.delta(&category.readings);
        }
    }
    factor
}

/// Metabolic age for a chronological age and a set of categories.
///
/// Rounded to one decimal and never below [`MIN_AGE`]. Absent categories
/// contribute nothing.
pub fn compute_metabolic_age(chronological_age: i64, categories: &[Category]) -> f64 {
    let base_age = clamp_age(chronological_age) as f64;
    let factor = aging_factor(categories);
    let age = round_one_decimal(base_age * factor);
    age.max(MIN_AGE as f64)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Chronological versus metabolic age
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeComparison {
    pub chronological_age: u32,
    pub metabolic_age: f64,
    /// Metabolic minus chronological, in years
    pub difference: f64,
    /// Whole years of difference, unsigned
    pub difference_years: u32,
    /// Metabolic age at or below chronological age
    pub younger: bool,
}

impl AgeComparison {
    pub fn new(chronological_age: u32, metabolic_age: f64) -> Self {
        let difference = metabolic_age - chronological_age as f64;
        Self {
            chronological_age,
            metabolic_age,
            difference,
            difference_years: difference.round().abs() as u32,
            younger: difference <= 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn cardio(ldl_particles: f64) -> Category {
        Category::new(
            CategoryId::Cardio,
            Readings::new()
                .with(Marker::LdlParticles, ldl_particles)
                .with(Marker::LdlSize, 21.0)
                .with(Marker::Triglycerides, 120.0),
        )
    }

    #[test]
    fn test_seed_metabolic_age() {
        let categories = seed::categories();
        let factor = aging_factor(&categories);
        assert!((factor - 1.05).abs() < 1e-9, "factor was {factor}");
        assert_eq!(compute_metabolic_age(40, &categories), 42.0);
    }

    #[test]
    fn test_first_matching_tier_wins() {
        assert!((category_delta(&cardio(1500.0)) - 0.04).abs() < 1e-9);
        assert!((category_delta(&cardio(1200.0)) - 0.02).abs() < 1e-9);
        assert!(category_delta(&cardio(1100.0)).abs() < 1e-9);
        assert!((category_delta(&cardio(900.0)) + 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_ldl_particles_monotonic() {
        let mut previous = f64::MIN;
        let mut count = 1000.0;
        while count <= 1600.0 {
            let factor = aging_factor(&[cardio(count)]);
            assert!(factor >= previous, "factor dropped at {count}");
            previous = factor;
            count += 10.0;
        }
    }

    #[test]
    fn test_fallbacks_contribute_nothing_or_protection() {
        // Absent LDL size and eGFR use healthy fallbacks
        let renal = Category::new(CategoryId::Renal, Readings::new());
        assert!((category_delta(&renal) + 0.01).abs() < 1e-9);

        let inflammation = Category::new(CategoryId::Inflammation, Readings::new());
        assert!((category_delta(&inflammation) + 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_glucose_between_tier() {
        let energy =
            |g| Category::new(CategoryId::Energy, Readings::new().with(Marker::Glucose, g));
        assert!((category_delta(&energy(80.0)) + 0.02).abs() < 1e-9);
        assert!(category_delta(&energy(90.0)).abs() < 1e-9);
        assert!(category_delta(&energy(70.0)).abs() < 1e-9);
        assert!((category_delta(&energy(96.0)) - 0.02).abs() < 1e-9);
        assert!((category_delta(&energy(106.0)) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_floor_at_minimum_age() {
        let protective = vec![
            cardio(900.0),
            Category::new(
                CategoryId::Inflammation,
                Readings::new().with(Marker::GlycA, 300.0),
            ),
            Category::new(
                CategoryId::Muscle,
                Readings::new().with(Marker::Leucine, 120.0),
            ),
        ];
        for age in [-3, 0, 10, 18] {
            assert!(compute_metabolic_age(age, &protective) >= 18.0);
            assert!(compute_metabolic_age(age, &[]) >= 18.0);
        }
    }

    #[test]
    fn test_no_categories_keeps_chronological_age() {
        assert_eq!(compute_metabolic_age(55, &[]), 55.0);
    }

    #[test]
    fn test_age_comparison() {
        let older = AgeComparison::new(40, 42.0);
        assert!(!older.younger);
        assert_eq!(older.difference_years, 2);

        let younger = AgeComparison::new(40, 37.6);
        assert!(younger.younger);
        assert_eq!(younger.difference_years, 2);

        assert!(AgeComparison::new(40, 40.0).younger);
    }

    fn signal_delta(marker: Marker, value: f64) -> f64 {
        let signal = SIGNALS.iter().find(|s| s.marker == marker).unwrap();
        signal.delta(&Readings::new().with(marker, value))
    }

    #[test]
    fn test_every_tier_boundary() {
        let cases = [
            (Marker::LdlParticles, 1400.1, 0.04),
            (Marker::LdlParticles, 1400.0, 0.02),
            (Marker::LdlParticles, 1150.1, 0.02),
            (Marker::LdlParticles, 1150.0, 0.0),
            (Marker::LdlParticles, 1000.0, 0.0),
            (Marker::LdlParticles, 999.9, -0.02),
            (Marker::LdlSize, 20.9, 0.04),
            (Marker::LdlSize, 20.91, 0.0),
            (Marker::LdlSize, 21.5, 0.0),
            (Marker::LdlSize, 21.51, -0.01),
            (Marker::Triglycerides, 150.1, 0.02),
            (Marker::Triglycerides, 150.0, 0.0),
            (Marker::Triglycerides, 90.0, 0.0),
            (Marker::Triglycerides, 89.9, -0.01),
            (Marker::GlycA, 600.1, 0.05),
            (Marker::GlycA, 600.0, 0.02),
            (Marker::GlycA, 450.1, 0.02),
            (Marker::GlycA, 450.0, 0.0),
            (Marker::GlycA, 380.0, 0.0),
            (Marker::GlycA, 379.9, -0.03),
            (Marker::Glucose, 105.1, 0.04),
            (Marker::Glucose, 105.0, 0.02),
            (Marker::Glucose, 95.1, 0.02),
            (Marker::Glucose, 95.0, 0.0),
            (Marker::Glucose, 90.0, 0.0),
            (Marker::Glucose, 89.9, -0.02),
            (Marker::Glucose, 70.1, -0.02),
            (Marker::Glucose, 70.0, 0.0),
            (Marker::Lactate, 550.1, 0.01),
            (Marker::Lactate, 550.0, 0.0),
            (Marker::Leucine, 74.9, 0.03),
            (Marker::Leucine, 75.0, 0.0),
            (Marker::Leucine, 110.0, 0.0),
            (Marker::Leucine, 110.1, -0.03),
            (Marker::Gfr, 74.9, 0.04),
            (Marker::Gfr, 75.0, 0.0),
            (Marker::Gfr, 95.0, 0.0),
            (Marker::Gfr, 95.1, -0.01),
        ];
        for (marker, value, expected) in cases {
            let delta = signal_delta(marker, value);
            assert!(
                (delta - expected).abs() < 1e-9,
                "{marker} = {value}: expected {expected}, got {delta}"
            );
        }
    }

    #[test]
    fn test_zero_reading_takes_fallback() {
        assert!((signal_delta(Marker::Gfr, 0.0) + 0.01).abs() < 1e-9);
        assert!((signal_delta(Marker::LdlSize, 0.0) + 0.01).abs() < 1e-9);
        assert!((signal_delta(Marker::GlycA, 0.0) + 0.03).abs() < 1e-9);
        assert!((signal_delta(Marker::Leucine, 0.0) - 0.03).abs() < 1e-9);
    }
}
