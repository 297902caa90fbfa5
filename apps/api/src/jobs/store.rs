//! Job Candidate Store: the authoritative in-memory state of the job session.
//!
//! Owns the candidate list, the active filters, the bookmarked / applied / dismissed
//! id sets and the swipe overlay flag. Every other component reads snapshots and
//! mutates only through the operations below.
//!
//! State lives behind a `watch` channel holding an `Arc<CandidateState>`: each
//! mutation runs atomically inside `send_if_modified` and copies the state on write
//! (`Arc::make_mut`), so snapshots handed out earlier never change underneath a
//! reader. Mutations that change nothing do not wake subscribers.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::models::job::{JobFilters, JobFiltersPatch, JobPosting};

/// Maximum number of candidates presented at once.
pub const VISIBLE_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateState {
    pub matches: Vec<JobPosting>,
    pub filters: JobFilters,
    pub bookmarked: BTreeSet<String>,
    pub applied: BTreeSet<String>,
    pub dismissed: BTreeSet<String>,
    pub overlay_open: bool,
}

impl CandidateState {
    /// Matches minus dismissed ids, capped at `VISIBLE_LIMIT`, in search-rank order.
    pub fn visible_candidates(&self) -> Vec<JobPosting> {
        self.matches
            .iter()
            .filter(|job| !self.dismissed.contains(&job.id))
            .take(VISIBLE_LIMIT)
            .cloned()
            .collect()
    }

    pub fn find_match(&self, job_id: &str) -> Option<&JobPosting> {
        self.matches.iter().find(|job| job.id == job_id)
    }
}

pub type StoreSnapshot = Arc<CandidateState>;

pub struct JobCandidateStore {
    state: watch::Sender<StoreSnapshot>,
}

impl Default for JobCandidateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobCandidateStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(CandidateState::default()));
        Self { state }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    /// Receives a fresh snapshot after every effective mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    pub fn visible_candidates(&self) -> Vec<JobPosting> {
        self.snapshot().visible_candidates()
    }

    fn mutate(&self, f: impl FnOnce(&mut CandidateState) -> bool) -> bool {
        self.state.send_if_modified(|snapshot| f(Arc::make_mut(snapshot)))
    }

    /// Replaces the candidate list wholesale. The id sets are left alone.
    pub fn set_matches(&self, jobs: Vec<JobPosting>) {
        let count = jobs.len();
        self.mutate(|state| {
            state.matches = jobs;
            true
        });
        debug!("Candidate list replaced ({count} matches)");
    }

    /// Shallow-merges `patch` into the stored filters and returns the result.
    pub fn set_filters(&self, patch: &JobFiltersPatch) -> JobFilters {
        let mut merged = JobFilters::default();
        self.mutate(|state| {
            merged = state.filters.merged(patch);
            if merged == state.filters {
                return false;
            }
            state.filters = merged.clone();
            true
        });
        merged
    }

    /// Flips bookmark membership. Returns whether the job is bookmarked afterwards.
    pub fn toggle_bookmark(&self, job_id: &str) -> bool {
        let mut bookmarked = false;
        self.mutate(|state| {
            bookmarked = if state.bookmarked.remove(job_id) {
                false
            } else {
                state.bookmarked.insert(job_id.to_string())
            };
            true
        });
        bookmarked
    }

    /// Idempotent bookmark. Returns true if the id was newly added.
    pub fn bookmark(&self, job_id: &str) -> bool {
        self.insert_into(job_id, IdSet::Bookmarked)
    }

    /// Idempotent. Returns true if the id was newly added.
    pub fn mark_applied(&self, job_id: &str) -> bool {
        self.insert_into(job_id, IdSet::Applied)
    }

    /// Idempotent. The id is excluded from every later visible derivation.
    pub fn dismiss(&self, job_id: &str) -> bool {
        self.insert_into(job_id, IdSet::Dismissed)
    }

    pub fn set_overlay_open(&self, open: bool) -> bool {
        self.mutate(|state| {
            let changed = state.overlay_open != open;
            state.overlay_open = open;
            changed
        })
    }

    fn insert_into(&self, job_id: &str, set: IdSet) -> bool {
        // Read-only pre-check so a repeated insert does not copy a shared snapshot.
        if self.state.borrow().ids(set).contains(job_id) {
            return false;
        }
        self.mutate(|state| state.ids_mut(set).insert(job_id.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
enum IdSet {
    Bookmarked,
    Applied,
    Dismissed,
}

impl CandidateState {
    fn ids(&self, set: IdSet) -> &BTreeSet<String> {
        match set {
            IdSet::Bookmarked => &self.bookmarked,
            IdSet::Applied => &self.applied,
            IdSet::Dismissed => &self.dismissed,
        }
    }

    fn ids_mut(&mut self, set: IdSet) -> &mut BTreeSet<String> {
        match set {
            IdSet::Bookmarked => &mut self.bookmarked,
            IdSet::Applied => &mut self.applied,
            IdSet::Dismissed => &mut self.dismissed,
        }
    }
}
