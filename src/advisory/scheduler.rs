//! Debounced advisory requests
//!
//! Every state change calls [`AdvisoryScheduler::schedule`]. The request
//! waits for a quiet period; a newer request aborts the pending one, and
//! only the newest generation may publish its result. Results are memoized
//! by [`cache_key`].
//!
//! `schedule` spawns onto the current tokio runtime and must be called from
//! within one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::provider::AdvisoryTextProvider;
use crate::store::MetricStore;
use crate::types::{Category, CategoryId};

/// Default quiet period before a request fires
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// Text shown before the first summary arrives
pub const INITIAL_TEXT: &str = "Initializing health analysis...";

/// Text served when the provider fails and the scope has no earlier text
pub const FALLBACK_TEXT: &str =
    "Your data has been analyzed. Keep up good habits and consult a specialist if you have doubts.";

/// What a summary is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryScope {
    Overall,
    Category(CategoryId),
}

/// Text currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryState {
    pub text: String,
    pub loading: bool,
}

/// Memoization key: `{category}_{age}` or `overall_{age}_{statuses}`
pub fn cache_key(scope: AdvisoryScope, age: u32, categories: &[Category]) -> String {
    match scope {
        AdvisoryScope::Category(id) => format!("{id}_{age}"),
        AdvisoryScope::Overall => {
            let statuses: String = categories.iter().map(|c| c.status.as_str()).collect();
            format!("overall_{age}_{statuses}")
        }
    }
}

#[derive(Default)]
struct Memo {
    entries: HashMap<String, String>,
    /// Most recent successful text per scope
    last_text: HashMap<AdvisoryScope, String>,
}

/// Debounce, cancel and cache wrapper around a provider
pub struct AdvisoryScheduler<P> {
    provider: Arc<P>,
    debounce: Duration,
    memo: Arc<Mutex<Memo>>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<AdvisoryState>>,
    pending: Option<JoinHandle<()>>,
}

impl<P: AdvisoryTextProvider + 'static> AdvisoryScheduler<P> {
    pub fn new(provider: P) -> Self {
        Self::with_debounce(provider, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(provider: P, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(AdvisoryState {
            text: INITIAL_TEXT.to_string(),
            loading: true,
        });
        Self {
            provider: Arc::new(provider),
            debounce,
            memo: Arc::new(Mutex::new(Memo::default())),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(tx),
            pending: None,
        }
    }

    /// Receiver that observes every published state
    pub fn subscribe(&self) -> watch::Receiver<AdvisoryState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AdvisoryState {
        self.state.borrow().clone()
    }

    /// Request a summary of the store, superseding any pending request
    pub fn schedule(&mut self, store: &MetricStore, active: Option<CategoryId>) {
        self.cancel();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let age = store.age();
        let categories = store.categories().to_vec();
        let scope = match active.filter(|id| store.category(*id).is_some()) {
            Some(id) => AdvisoryScope::Category(id),
            None => AdvisoryScope::Overall,
        };

        let task = Request {
            provider: Arc::clone(&self.provider),
            memo: Arc::clone(&self.memo),
            generation_counter: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
            generation,
            debounce: self.debounce,
            scope,
            age,
            categories,
        };
        debug!(generation, ?scope, age, "advisory request scheduled");
        self.pending = Some(tokio::spawn(task.run()));
    }

    /// Drop the pending request, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait for the pending request to finish
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl<P> Drop for AdvisoryScheduler<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

struct Request<P> {
    provider: Arc<P>,
    memo: Arc<Mutex<Memo>>,
    generation_counter: Arc<AtomicU64>,
    state: Arc<watch::Sender<AdvisoryState>>,
    generation: u64,
    debounce: Duration,
    scope: AdvisoryScope,
    age: u32,
    categories: Vec<Category>,
}

impl<P: AdvisoryTextProvider> Request<P> {
    fn is_current(&self) -> bool {
        self.generation_counter.load(Ordering::SeqCst) == self.generation
    }

    fn publish(&self, text: String, loading: bool) {
        if self.is_current() {
            self.state.send_replace(AdvisoryState { text, loading });
        }
    }

    async fn run(self) {
        tokio::time::sleep(self.debounce).await;
        if !self.is_current() {
            return;
        }

        let key = cache_key(self.scope, self.age, &self.categories);
        if let Some(text) = self.memo.lock().await.entries.get(&key).cloned() {
            debug!(%key, "advisory cache hit");
            self.publish(text, false);
            return;
        }

        let result = match self.scope {
            AdvisoryScope::Category(id) => {
                let Some(category) = self.categories.iter().find(|c| c.id == id) else {
                    return;
                };
                self.publish(
                    format!("Analyzing {} for age {}...", category.title, self.age),
                    true,
                );
                self.provider.summarize_category(category, self.age).await
            }
            AdvisoryScope::Overall => {
                self.publish(
                    format!("Generating overall summary for age {}...", self.age),
                    true,
                );
                self.provider
                    .summarize_overall(&self.categories, self.age)
                    .await
            }
        };

        let mut memo = self.memo.lock().await;
        let text = match result {
            Ok(text) => {
                memo.entries.insert(key, text.clone());
                memo.last_text.insert(self.scope, text.clone());
                text
            }
            Err(e) => {
                warn!(error = %e, "advisory provider failed, serving fallback text");
                memo.last_text
                    .get(&self.scope)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_TEXT.to_string())
            }
        };
        drop(memo);
        self.publish(text, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::provider::{AdvisoryError, LocalAdvisor};
    use crate::types::Marker;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Provider that counts calls and can be switched to failing
    #[derive(Default)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
    }

    impl CountingProvider {
        fn fail(&self) -> bool {
            self.failing.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdvisoryTextProvider for CountingProvider {
        async fn summarize_overall(
            &self,
            categories: &[Category],
            age: u32,
        ) -> Result<String, AdvisoryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail() {
                return Err(AdvisoryError::ProviderUnavailable("offline".to_string()));
            }
            Ok(format!("overall #{n} for {} at {age}", categories.len()))
        }

        async fn summarize_category(
            &self,
            category: &Category,
            age: u32,
        ) -> Result<String, AdvisoryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail() {
                return Err(AdvisoryError::ProviderUnavailable("offline".to_string()));
            }
            Ok(format!("{} #{n} at {age}", category.id))
        }
    }

    #[test]
    fn test_cache_key() {
        let store = MetricStore::seeded();
        assert_eq!(
            cache_key(AdvisoryScope::Overall, 40, store.categories()),
            "overall_40_alertgoodgoodalertgood"
        );
        assert_eq!(
            cache_key(
                AdvisoryScope::Category(CategoryId::Renal),
                40,
                store.categories()
            ),
            "renal_40"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_requests_collapse_into_one() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            calls: Arc::clone(&calls),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let mut store = MetricStore::seeded();

        for age in 41..46 {
            store.set_age(age);
            scheduler.schedule(&store, None);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        scheduler.flush().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let state = scheduler.current();
        assert_eq!(state.text, "overall #1 for 5 at 45");
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            calls: Arc::clone(&calls),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let store = MetricStore::seeded();

        scheduler.schedule(&store, Some(CategoryId::Cardio));
        scheduler.flush().await;
        scheduler.schedule(&store, None);
        scheduler.flush().await;
        scheduler.schedule(&store, Some(CategoryId::Cardio));
        scheduler.flush().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.current().text, "cardio #1 at 40");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_change_misses_overall_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            calls: Arc::clone(&calls),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let mut store = MetricStore::seeded();

        scheduler.schedule(&store, None);
        scheduler.flush().await;
        store
            .set_reading(CategoryId::Renal, Marker::Gfr, 60.0)
            .unwrap();
        scheduler.schedule(&store, None);
        scheduler.flush().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_fallback() {
        let provider = CountingProvider {
            failing: Arc::new(AtomicBool::new(true)),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let store = MetricStore::seeded();

        scheduler.schedule(&store, None);
        scheduler.flush().await;

        let state = scheduler.current();
        assert_eq!(state.text, FALLBACK_TEXT);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_last_text_of_same_scope() {
        let failing = Arc::new(AtomicBool::new(false));
        let provider = CountingProvider {
            failing: Arc::clone(&failing),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let mut store = MetricStore::seeded();

        scheduler.schedule(&store, None);
        scheduler.flush().await;
        scheduler.schedule(&store, Some(CategoryId::Cardio));
        scheduler.flush().await;
        assert_eq!(scheduler.current().text, "cardio #2 at 40");

        failing.store(true, Ordering::SeqCst);
        store.set_age(41);
        scheduler.schedule(&store, None);
        scheduler.flush().await;
        assert_eq!(scheduler.current().text, "overall #1 for 5 at 40");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_ignores_text_of_other_scope() {
        let failing = Arc::new(AtomicBool::new(false));
        let provider = CountingProvider {
            failing: Arc::clone(&failing),
            ..Default::default()
        };
        let mut scheduler = AdvisoryScheduler::new(provider);
        let store = MetricStore::seeded();

        scheduler.schedule(&store, Some(CategoryId::Cardio));
        scheduler.flush().await;
        assert_eq!(scheduler.current().text, "cardio #1 at 40");

        failing.store(true, Ordering::SeqCst);
        scheduler.schedule(&store, None);
        scheduler.flush().await;
        assert_eq!(scheduler.current().text, FALLBACK_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_publication() {
        let mut scheduler = AdvisoryScheduler::new(CountingProvider::default());
        let store = MetricStore::seeded();

        scheduler.schedule(&store, None);
        scheduler.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(scheduler.current().text, INITIAL_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_advisor_through_scheduler() {
        let mut scheduler = AdvisoryScheduler::new(LocalAdvisor::new());
        let mut rx = scheduler.subscribe();
        let store = MetricStore::seeded();

        scheduler.schedule(&store, Some(CategoryId::Renal));

        rx.changed().await.unwrap();
        let loading = rx.borrow_and_update().clone();
        assert!(loading.loading);
        assert!(loading.text.starts_with("Analyzing Renal Function"));

        scheduler.flush().await;
        let done = scheduler.current();
        assert!(!done.loading);
        assert!(done.text.starts_with("Kidney function is flawless"));
    }
}
