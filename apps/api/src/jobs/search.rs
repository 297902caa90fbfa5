//! Search workflow: runs the job search collaborator and replaces the candidate
//! list on success.
//!
//! The store is only touched after the response resolves successfully; a failed
//! or missing response leaves the previous candidates in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::jobs::filters::SearchTrigger;
use crate::jobs::store::JobCandidateStore;
use crate::jobs_client::{JobSearchService, JobsApiError, SearchRequest};
use crate::models::job::JobFilters;
use crate::models::resume::ResumeSlot;

const SEARCH_FAILED: &str = "Failed to fetch jobs.";
const CONFIGURATION_MISSING: &str = "API configuration missing.";

/// Status of the most recent search, shown next to the candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
    Ready {
        count: usize,
        total_results: u64,
    },
    Failed {
        message: String,
    },
}

pub struct SearchWorkflow {
    store: Arc<JobCandidateStore>,
    resume: Arc<ResumeSlot>,
    service: Arc<dyn JobSearchService>,
    limit: u8,
    status: watch::Sender<SearchStatus>,
    /// Bumped by every search; a response is only applied if no newer search started.
    generation: AtomicU64,
}

impl SearchWorkflow {
    pub fn new(
        store: Arc<JobCandidateStore>,
        resume: Arc<ResumeSlot>,
        service: Arc<dyn JobSearchService>,
        limit: u8,
    ) -> Self {
        let (status, _) = watch::channel(SearchStatus::Idle);
        Self {
            store,
            resume,
            service,
            limit,
            status,
            generation: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> SearchStatus {
        self.status.borrow().clone()
    }

    /// Searches with `filters` and replaces the candidate list with the results.
    /// Returns the number of jobs received. A response that arrives after a newer
    /// search has started is discarded with a `Conflict` error.
    pub async fn run(&self, filters: &JobFilters) -> Result<usize, AppError> {
        let Some(resume_text) = self.resume.text() else {
            self.fail(CONFIGURATION_MISSING);
            return Err(AppError::Configuration(
                "Resume text is missing. Upload a resume before searching.".to_string(),
            ));
        };

        let request = SearchRequest::new(&resume_text, self.limit, filters);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(SearchStatus::Loading);
        debug!("Searching jobs (#{generation}) with {:?}", request.filters);

        let result = self.service.search(&request).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding response of superseded search #{generation}");
            return Err(AppError::Conflict(
                "A newer search superseded this one".to_string(),
            ));
        }

        match result {
            Ok(response) => {
                let count = response.jobs.len();
                self.store.set_matches(response.jobs);
                self.status.send_replace(SearchStatus::Ready {
                    count,
                    total_results: response.total_results,
                });
                info!("Job search returned {count} matches");
                Ok(count)
            }
            Err(JobsApiError::MissingEndpoint) => {
                self.fail(CONFIGURATION_MISSING);
                Err(JobsApiError::MissingEndpoint.into())
            }
            Err(e) => {
                warn!("Job search failed: {e}");
                self.fail(SEARCH_FAILED);
                Err(e.into())
            }
        }
    }

    fn fail(&self, message: &str) {
        self.status.send_replace(SearchStatus::Failed {
            message: message.to_string(),
        });
    }
}

/// Consumes re-search signals until every sender is dropped. Bursts of triggers are
/// coalesced so only the latest filters are searched.
pub async fn run_search_worker(
    workflow: Arc<SearchWorkflow>,
    mut triggers: mpsc::UnboundedReceiver<SearchTrigger>,
) {
    while let Some(mut trigger) = triggers.recv().await {
        while let Ok(next) = triggers.try_recv() {
            trigger = next;
        }
        match workflow.run(&trigger.filters).await {
            Ok(_) | Err(AppError::Conflict(_)) => {}
            Err(e) => warn!("Background job search failed: {e}"),
        }
    }
    debug!("Search trigger channel closed; search worker exiting");
}
