//! Filter Merger: applies partial filter updates and asks for a fresh search.
//!
//! Performs no I/O itself: the merged filters are handed to the search worker over
//! a channel, and the worker owns the call to the search service.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::jobs::store::JobCandidateStore;
use crate::models::job::{JobFilters, JobFiltersPatch};

/// Request for the search worker to re-run a search with these filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTrigger {
    pub filters: JobFilters,
}

pub struct FilterMerger {
    store: Arc<JobCandidateStore>,
    trigger: mpsc::UnboundedSender<SearchTrigger>,
}

impl FilterMerger {
    pub fn new(store: Arc<JobCandidateStore>, trigger: mpsc::UnboundedSender<SearchTrigger>) -> Self {
        Self { store, trigger }
    }

    /// Merges `patch` into the stored filters, then signals a re-search.
    /// The merge stands even if no search worker is listening.
    pub fn update_filters(&self, patch: &JobFiltersPatch) -> JobFilters {
        let merged = self.store.set_filters(patch);
        debug!("Filters merged: {:?}", merged);
        self.request_search(merged.clone());
        merged
    }

    /// Signals a search with the currently stored filters.
    pub fn request_refresh(&self) -> bool {
        let filters = self.store.snapshot().filters.clone();
        self.request_search(filters)
    }

    fn request_search(&self, filters: JobFilters) -> bool {
        if self.trigger.send(SearchTrigger { filters }).is_err() {
            warn!("Search worker is not running; re-search request dropped");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::EmploymentType;

    #[test]
    fn test_update_filters_merges_then_signals() {
        let store = Arc::new(JobCandidateStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let merger = FilterMerger::new(store.clone(), tx);

        merger.update_filters(&JobFiltersPatch {
            keywords: Some("data engineer".to_string()),
            ..Default::default()
        });
        let merged = merger.update_filters(&JobFiltersPatch {
            employment_type: Some(EmploymentType::Parttime),
            ..Default::default()
        });

        assert_eq!(merged.keywords.as_deref(), Some("data engineer"));
        assert_eq!(store.snapshot().filters, merged);

        let first = rx.try_recv().expect("first trigger");
        let second = rx.try_recv().expect("second trigger");
        assert_eq!(first.filters.employment_type, EmploymentType::Any);
        assert_eq!(second.filters, merged);
    }

    #[test]
    fn test_update_filters_without_worker_still_merges() {
        let store = Arc::new(JobCandidateStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let merger = FilterMerger::new(store.clone(), tx);

        let merged = merger.update_filters(&JobFiltersPatch {
            location: Some("Remote".to_string()),
            ..Default::default()
        });

        assert_eq!(store.snapshot().filters.location.as_deref(), Some("Remote"));
        assert_eq!(merged.location.as_deref(), Some("Remote"));
        assert!(!merger.request_refresh());
    }
}
