//! Advisory text
//!
//! Plain-language summaries of the dashboard state. A provider turns a
//! snapshot plus age into text; the scheduler debounces, cancels and caches
//! provider calls on behalf of an interactive host.

pub mod provider;
pub mod scheduler;

pub use provider::{AdvisoryError, AdvisoryTextProvider, LocalAdvisor};
pub use scheduler::{cache_key, AdvisoryScheduler, AdvisoryScope, AdvisoryState};
