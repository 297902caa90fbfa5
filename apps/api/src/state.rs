use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::config::Config;
use crate::jobs::coordinator::ApplicationCoordinator;
use crate::jobs::filters::{FilterMerger, SearchTrigger};
use crate::jobs::search::SearchWorkflow;
use crate::jobs::store::JobCandidateStore;
use crate::jobs::swipe::SwipeDecisionEngine;
use crate::jobs_client::{ApplicationService, JobSearchService};
use crate::models::resume::ResumeSlot;

/// Shared application state injected into all route handlers via Axum extractors.
/// One instance per session: the service hosts a single candidate.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<JobCandidateStore>,
    pub resume: Arc<ResumeSlot>,
    pub filters: Arc<FilterMerger>,
    pub search: Arc<SearchWorkflow>,
    pub swipe: Arc<Mutex<SwipeDecisionEngine>>,
    pub applications: Arc<ApplicationCoordinator>,
}

impl AppState {
    /// Wires the workflows around one store. The returned receiver feeds the
    /// search worker; the caller decides where that worker runs.
    pub fn new(
        config: Config,
        search_service: Arc<dyn JobSearchService>,
        application_service: Arc<dyn ApplicationService>,
    ) -> (Self, mpsc::UnboundedReceiver<SearchTrigger>) {
        let store = Arc::new(JobCandidateStore::new());
        let resume = Arc::new(ResumeSlot::default());
        let (trigger, triggers) = mpsc::unbounded_channel();

        let search = Arc::new(SearchWorkflow::new(
            store.clone(),
            resume.clone(),
            search_service,
            config.search_limit,
        ));
        let applications = Arc::new(ApplicationCoordinator::new(
            store.clone(),
            resume.clone(),
            application_service,
        ));

        let state = Self {
            filters: Arc::new(FilterMerger::new(store.clone(), trigger)),
            swipe: Arc::new(Mutex::new(SwipeDecisionEngine::new())),
            config,
            store,
            resume,
            search,
            applications,
        };
        (state, triggers)
    }

    pub fn swipe(&self) -> MutexGuard<'_, SwipeDecisionEngine> {
        self.swipe.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
