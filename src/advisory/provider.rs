//! Advisory text providers
//!
//! [`AdvisoryTextProvider`] is the boundary a remote text-generation backend
//! would implement: the request is a category snapshot plus the age, the
//! response is free text or [`AdvisoryError::ProviderUnavailable`].
//! [`LocalAdvisor`] answers from fixed templates after a simulated delay.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::thresholds::{self, Violation};
use crate::types::{Category, CategoryId, Marker, Status};

/// Default simulated latency of an overall summary
pub const OVERALL_DELAY: Duration = Duration::from_millis(800);

/// Default simulated latency of a single-category summary
pub const CATEGORY_DELAY: Duration = Duration::from_millis(600);

/// Errors raised by advisory providers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisoryError {
    #[error("Advisory provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Produces advisory text for a dashboard snapshot
#[async_trait]
pub trait AdvisoryTextProvider: Send + Sync {
    /// Summary across every category
    async fn summarize_overall(
        &self,
        categories: &[Category],
        age: u32,
    ) -> Result<String, AdvisoryError>;

    /// Summary focused on one category
    async fn summarize_category(
        &self,
        category: &Category,
        age: u32,
    ) -> Result<String, AdvisoryError>;
}

/// Template-based provider with fixed latency
#[derive(Debug, Clone)]
pub struct LocalAdvisor {
    overall_delay: Duration,
    category_delay: Duration,
}

impl Default for LocalAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAdvisor {
    pub fn new() -> Self {
        Self {
            overall_delay: OVERALL_DELAY,
            category_delay: CATEGORY_DELAY,
        }
    }

    /// Advisor with custom simulated latencies
    pub fn with_delays(overall_delay: Duration, category_delay: Duration) -> Self {
        Self {
            overall_delay,
            category_delay,
        }
    }
}

#[async_trait]
impl AdvisoryTextProvider for LocalAdvisor {
    async fn summarize_overall(
        &self,
        categories: &[Category],
        age: u32,
    ) -> Result<String, AdvisoryError> {
        tokio::time::sleep(self.overall_delay).await;
        Ok(overall_text(categories, age))
    }

    async fn summarize_category(
        &self,
        category: &Category,
        age: u32,
    ) -> Result<String, AdvisoryError> {
        tokio::time::sleep(self.category_delay).await;
        Ok(category_text(category, age))
    }
}

/// Overall summary chosen by the number of categories in alert
pub fn overall_text(categories: &[Category], age: u32) -> String {
    let alerts: Vec<&Category> = categories
        .iter()
        .filter(|c| c.status == Status::Alert)
        .collect();

    match alerts.as_slice() {
        [] => format!(
            "At {age}, you are in great shape! All {} analyzed areas show optimal values. \
             Your metabolism and cardiovascular system are responding well. \
             Keep up your current lifestyle!",
            categories.len()
        ),
        [issue] => format!(
            "Overall your health is very solid for {age}, with most areas in the green. \
             We should keep an eye on {} though. Small adjustments to diet or exercise \
             could clear this alert quickly.",
            issue.title.to_lowercase()
        ),
        many => {
            let titles: Vec<&str> = many.iter().map(|c| c.title.as_str()).collect();
            format!(
                "At {age}, looking after yourself matters. We detected imbalances in: {}. \
                 There is no need for alarm, but your body is asking for attention. \
                 Prioritize rest, review your diet and reduce stress to improve these markers.",
                join_with_and(&titles)
            )
        }
    }
}

/// Category summary chosen by status and the specific markers out of range
pub fn category_text(category: &Category, _age: u32) -> String {
    let alert = category.status == Status::Alert;
    let violations = thresholds::violations(category.id, &category.readings);
    let violated = |marker: Marker| violations.iter().any(|v| v.marker == marker);

    let text = match category.id {
        CategoryId::Cardio if alert => {
            if violated(Marker::LdlCholesterol) && violated(Marker::LdlParticles) {
                "Your LDL cholesterol and LDL particle count are both elevated, which raises \
                 atherogenic risk. Cut back on saturated fat and increase fiber and omega-3 intake."
            } else if violated(Marker::LdlSize) {
                "Your LDL particles are too small, which is a risk factor on its own. \
                 Regular aerobic exercise will help improve this profile."
            } else {
                "There is some cardiovascular risk. Watch your salt and fat intake. \
                 This is a good moment to start walking 30 minutes a day."
            }
        }
        CategoryId::Cardio => {
            "Your lipid profile is excellent. Your heart works without overload and your \
             arteries stay clear of harmful cholesterol."
        }
        CategoryId::Inflammation if alert => {
            if violated(Marker::GlycA) {
                "Glyc-A is high, pointing to chronic systemic inflammation. Stress or a recent \
                 infection can cause it. Prioritize 8 hours of sleep and antioxidant-rich food."
            } else {
                "We detect signs of inflammation; your body is fighting some stressor. \
                 Try to reduce processed food and sugar in your diet."
            }
        }
        CategoryId::Inflammation => {
            "Your inflammation levels are very low (Glyc-A and Glyc-B in range). \
             This is key for longevity and for preventing chronic disease."
        }
        CategoryId::Energy if alert => {
            if violated(Marker::Glucose) {
                "Your glucose is not stable. Avoid sugar spikes and favor complex \
                 carbohydrates to keep your energy steady."
            } else if violated(Marker::Lactate) {
                "Lactate is elevated, suggesting metabolic fatigue or poor cellular oxygenation. \
                 Make sure you recover well between efforts."
            } else {
                "Your energy metabolism shows some instability. Review your meal times."
            }
        }
        CategoryId::Energy => {
            "Your metabolic flexibility is very good. Your body handles glucose and ketones \
             efficiently to keep your energy up all day."
        }
        CategoryId::Muscle if alert => {
            if violations.iter().any(is_low_leucine) {
                "Your leucine is low, and it is key for muscle. Increase your intake of quality \
                 protein (eggs, fish, legumes) to prevent muscle loss."
            } else {
                "Your muscle markers suggest some wear or incomplete recovery. Rest more and \
                 make sure you refuel after exercise."
            }
        }
        CategoryId::Muscle => {
            "Your muscle mass is well nourished and strong. Amino acid (BCAA) and creatine \
             levels indicate good structure and functional power."
        }
        CategoryId::Renal if alert => {
            "Creatinine is outside the optimal range. Drink considerably more water and avoid \
             excess salt or unnecessary protein supplements."
        }
        CategoryId::Renal => {
            "Kidney function is flawless. Your kidneys filter your blood perfectly. \
             Keep up the good hydration!"
        }
    };
    text.to_string()
}

fn is_low_leucine(violation: &Violation) -> bool {
    violation.marker == Marker::Leucine && violation.value < 72.0
}

/// Join items as `a, b and c`
fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use crate::store::MetricStore;
    use crate::types::Readings;

    #[test]
    fn test_overall_text_without_alerts() {
        let categories: Vec<Category> = seed::categories()
            .into_iter()
            .map(|mut c| {
                c.status = Status::Good;
                c
            })
            .collect();
        let text = overall_text(&categories, 35);
        assert!(text.starts_with("At 35, you are in great shape!"));
        assert!(text.contains("All 5 analyzed areas"));
    }

    #[test]
    fn test_overall_text_single_alert() {
        let mut store = MetricStore::seeded();
        store
            .set_reading(CategoryId::Cardio, Marker::LdlCholesterol, 100.0)
            .unwrap();
        store
            .set_reading(CategoryId::Cardio, Marker::CholesterolTotal, 180.0)
            .unwrap();
        store
            .set_reading(CategoryId::Cardio, Marker::LdlParticles, 1000.0)
            .unwrap();
        store
            .set_reading(CategoryId::Cardio, Marker::LdlSize, 21.0)
            .unwrap();
        let text = overall_text(store.categories(), 40);
        assert!(text.contains("keep an eye on muscle mass"));
    }

    #[test]
    fn test_overall_text_lists_alerts() {
        let store = MetricStore::seeded();
        let text = overall_text(store.categories(), 40);
        assert!(text.contains("imbalances in: Cardiovascular Health and Muscle Mass."));
    }

    #[test]
    fn test_join_with_and() {
        assert_eq!(join_with_and(&["a"]), "a");
        assert_eq!(join_with_and(&["a", "b"]), "a and b");
        assert_eq!(join_with_and(&["a", "b", "c"]), "a, b and c");
    }

    #[test]
    fn test_cardio_text_picks_specific_issue() {
        let store = MetricStore::seeded();
        let cardio = store.category(CategoryId::Cardio).unwrap();
        assert!(category_text(cardio, 40).contains("LDL cholesterol and LDL particle count"));

        let small_only = MetricStore::new(
            vec![Category::new(
                CategoryId::Cardio,
                Readings::new().with(Marker::LdlSize, 20.0),
            )],
            40,
        );
        let cardio = small_only.category(CategoryId::Cardio).unwrap();
        assert!(category_text(cardio, 40).contains("too small"));
    }

    #[test]
    fn test_muscle_text_detects_low_leucine() {
        let mut store = MetricStore::seeded();
        store
            .set_reading(CategoryId::Muscle, Marker::Leucine, 60.0)
            .unwrap();
        let muscle = store.category(CategoryId::Muscle).unwrap();
        assert!(category_text(muscle, 40).starts_with("Your leucine is low"));

        let seeded = MetricStore::seeded();
        let muscle = seeded.category(CategoryId::Muscle).unwrap();
        assert!(category_text(muscle, 40).contains("wear or incomplete recovery"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_advisor_waits_before_answering() {
        let advisor = LocalAdvisor::new();
        let store = MetricStore::seeded();
        let start = tokio::time::Instant::now();

        let renal = store.category(CategoryId::Renal).unwrap();
        let text = advisor.summarize_category(renal, 40).await.unwrap();
        assert!(text.starts_with("Kidney function is flawless"));
        assert!(start.elapsed() >= CATEGORY_DELAY);

        let text = advisor
            .summarize_overall(store.categories(), 40)
            .await
            .unwrap();
        assert!(text.contains("imbalances"));
        assert!(start.elapsed() >= CATEGORY_DELAY + OVERALL_DELAY);
    }
}
