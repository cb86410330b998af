//! Threshold evaluation
//!
//! Each category owns an ordered table of threshold rules. A category is in
//! `alert` when any rule is violated and `good` otherwise. The same tables
//! render the reference ranges shown next to each reading.
//!
//! Absent readings use a per-rule fallback. Some fallbacks are safe (an
//! absent HDL never alerts) and some are not (an absent glucose reads as 0,
//! which is below the healthy range).

use serde::Serialize;
use std::fmt;

use crate::types::{CategoryId, Marker, Readings, Status};

/// Alert condition on a single reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    /// Alert when the value is strictly greater than the limit
    Above(f64),
    /// Alert when the value is strictly less than the limit
    Below(f64),
    /// Alert when the value leaves the inclusive healthy range
    Outside { low: f64, high: f64 },
}

impl Limit {
    pub fn is_violated(&self, value: f64) -> bool {
        match *self {
            Limit::Above(limit) => value > limit,
            Limit::Below(limit) => value < limit,
            Limit::Outside { low, high } => value < low || value > high,
        }
    }
}

/// Renders the healthy side of the limit, e.g. `< 200` for `Above(200)`
impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Above(limit) => write!(f, "< {limit}"),
            Limit::Below(limit) => write!(f, "> {limit}"),
            Limit::Outside { low, high } => write!(f, "{low} - {high}"),
        }
    }
}

/// One threshold rule of a category table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdRule {
    pub marker: Marker,
    pub limit: Limit,
    /// Value used when the reading is absent
    pub fallback: f64,
}

impl ThresholdRule {
    const fn new(marker: Marker, limit: Limit, fallback: f64) -> Self {
        Self {
            marker,
            limit,
            fallback,
        }
    }

    /// Effective value this rule reads from `readings`
    pub fn value(&self, readings: &Readings) -> f64 {
        readings.value_or(self.marker, self.fallback)
    }

    pub fn is_violated(&self, readings: &Readings) -> bool {
        self.limit.is_violated(self.value(readings))
    }
}

const CARDIO_RULES: &[ThresholdRule] = &[
    ThresholdRule::new(Marker::CholesterolTotal, Limit::Above(200.0), 0.0),
    ThresholdRule::new(Marker::LdlCholesterol, Limit::Above(116.0), 0.0),
    ThresholdRule::new(Marker::HdlCholesterol, Limit::Below(40.0), 100.0),
    ThresholdRule::new(Marker::Triglycerides, Limit::Above(150.0), 0.0),
    ThresholdRule::new(Marker::LdlParticles, Limit::Above(1150.0), 0.0),
    ThresholdRule::new(Marker::LdlSize, Limit::Below(20.91), 99.0),
];

const INFLAMMATION_RULES: &[ThresholdRule] = &[
    ThresholdRule::new(Marker::GlycA, Limit::Above(650.0), 0.0),
    ThresholdRule::new(Marker::GlycB, Limit::Above(340.0), 0.0),
];

const ENERGY_RULES: &[ThresholdRule] = &[
    ThresholdRule::new(
        Marker::Glucose,
        Limit::Outside {
            low: 67.0,
            high: 100.0,
        },
        0.0,
    ),
    ThresholdRule::new(Marker::Lactate, Limit::Above(550.0), 0.0),
    ThresholdRule::new(Marker::Ketones, Limit::Above(100.0), 0.0),
];

const MUSCLE_RULES: &[ThresholdRule] = &[
    ThresholdRule::new(
        Marker::Valine,
        Limit::Outside {
            low: 125.0,
            high: 205.0,
        },
        0.0,
    ),
    ThresholdRule::new(
        Marker::Leucine,
        Limit::Outside {
            low: 72.0,
            high: 127.0,
        },
        0.0,
    ),
    ThresholdRule::new(
        Marker::Isoleucine,
        Limit::Outside {
            low: 20.0,
            high: 51.0,
        },
        0.0,
    ),
    ThresholdRule::new(
        Marker::Glutamine,
        Limit::Outside {
            low: 400.0,
            high: 900.0,
        },
        0.0,
    ),
    ThresholdRule::new(
        Marker::Glutamate,
        Limit::Outside {
            low: 20.0,
            high: 150.0,
        },
        0.0,
    ),
    ThresholdRule::new(
        Marker::Creatine,
        Limit::Outside {
            low: 20.0,
            high: 150.0,
        },
        0.0,
    ),
];

const RENAL_RULES: &[ThresholdRule] = &[
    ThresholdRule::new(
        Marker::Creatinine,
        Limit::Outside {
            low: 28.0,
            high: 59.0,
        },
        0.0,
    ),
    ThresholdRule::new(Marker::Gfr, Limit::Below(90.0), 100.0),
];

/// Rule table for a category
pub fn rules_for(category: CategoryId) -> &'static [ThresholdRule] {
    match category {
        CategoryId::Cardio => CARDIO_RULES,
        CategoryId::Inflammation => INFLAMMATION_RULES,
        CategoryId::Energy => ENERGY_RULES,
        CategoryId::Muscle => MUSCLE_RULES,
        CategoryId::Renal => RENAL_RULES,
    }
}

/// Classify a category from its readings
pub fn evaluate(category: CategoryId, readings: &Readings) -> Status {
    if rules_for(category).iter().any(|rule| rule.is_violated(readings)) {
        Status::Alert
    } else {
        Status::Good
    }
}

/// Classify a category by string id; unrecognized ids are always `neutral`
pub fn evaluate_named(id: &str, readings: &Readings) -> Status {
    match CategoryId::parse(id) {
        Some(category) => evaluate(category, readings),
        None => Status::Neutral,
    }
}

/// A violated rule together with the value that violated it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Violation {
    pub marker: Marker,
    pub value: f64,
    pub limit: Limit,
    /// True when `value` came from the rule's fallback
    pub fallback: bool,
}

/// All violated rules of a category, in table order
pub fn violations(category: CategoryId, readings: &Readings) -> Vec<Violation> {
    rules_for(category)
        .iter()
        .filter(|rule| rule.is_violated(readings))
        .map(|rule| Violation {
            marker: rule.marker,
            value: rule.value(readings),
            limit: rule.limit,
            fallback: !readings.contains(rule.marker),
        })
        .collect()
}

/// Healthy reference range of a marker, if any rule covers it
pub fn reference_range(marker: Marker) -> Option<Limit> {
    rules_for(marker.category())
        .iter()
        .find(|rule| rule.marker == marker)
        .map(|rule| rule.limit)
}
