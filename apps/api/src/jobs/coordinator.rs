//! Application Coordinator: single-apply and apply-all workflows.
//!
//! Flow (single): validate required fields locally → submit → on `Submitted`
//! mark the job applied. Flow (batch): one request per job → partition the tagged
//! responses as each arrives → mark each submitted job applied, one at a time → summarise.
//!
//! The store is only written after a response resolves. Closing the apply session
//! never retracts a request already sent: a late `Submitted` still marks the job
//! applied even though the session that sent it is gone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::fields::{
    field_prompts, missing_fields, prefill_batch, prefill_single, union_required, FieldPrompt,
};
use crate::jobs::store::JobCandidateStore;
use crate::jobs::swipe::ApplyHandoff;
use crate::jobs_client::{
    ApplicationPayload, ApplicationService, ApplyOutcome, ApplyRequest, BatchApplyEntry,
    BatchApplyRequest, JobsApiError,
};
use crate::models::job::{FieldValues, JobPosting};
use crate::models::resume::ResumeSlot;

const SINGLE_FAILED: &str = "Unable to submit right now.";
const BATCH_FAILED: &str = "Unable to submit applications right now.";

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleApplyResult {
    pub job_id: String,
    pub outcome: ApplyOutcome,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeedsInfoEntry {
    pub job_id: String,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedEntry {
    pub job_id: String,
    pub reason: String,
}

/// Aggregate result of an apply-all run. Partial success is not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyAllSummary {
    pub union_required: Vec<String>,
    pub submitted: Vec<String>,
    pub needs_info: Vec<NeedsInfoEntry>,
    pub failed: Vec<FailedEntry>,
    pub message: String,
}

impl ApplyAllSummary {
    pub fn submitted_count(&self) -> usize {
        self.submitted.len()
    }

    pub fn needs_info_count(&self) -> usize {
        self.needs_info.len()
    }

    /// Every entry errored. Already-applied jobs are never rolled back.
    pub fn is_full_failure(&self) -> bool {
        !self.failed.is_empty() && self.submitted.is_empty() && self.needs_info.is_empty()
    }

    fn describe(&self) -> String {
        if self.is_full_failure() {
            return BATCH_FAILED.to_string();
        }
        let submitted = self.submitted_count();
        match self.needs_info_count() {
            0 => format!("Applied to {submitted} jobs. All set!"),
            n => format!("Applied to {submitted} jobs. {n} need more info."),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SessionKind {
    Single(JobPosting),
    /// Jobs of the batch not yet submitted.
    Batch { pending: Vec<JobPosting> },
}

#[derive(Debug, Clone)]
struct ApplySession {
    id: Uuid,
    kind: SessionKind,
    required: Vec<String>,
    fields: FieldValues,
    status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Single,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplySessionView {
    pub id: Uuid,
    pub mode: SessionMode,
    pub title: String,
    pub company: String,
    pub job_ids: Vec<String>,
    pub fields: Vec<FieldPrompt>,
    pub status: Option<String>,
}

impl ApplySession {
    fn view(&self) -> ApplySessionView {
        let (mode, title, company, job_ids) = match &self.kind {
            SessionKind::Single(job) => (
                SessionMode::Single,
                job.title.clone(),
                job.company.clone(),
                vec![job.id.clone()],
            ),
            SessionKind::Batch { pending } => (
                SessionMode::Batch,
                "Apply to all matches".to_string(),
                format!("{} roles", pending.len()),
                pending.iter().map(|j| j.id.clone()).collect(),
            ),
        };
        ApplySessionView {
            id: self.id,
            mode,
            title,
            company,
            job_ids,
            fields: field_prompts(&self.required, &self.fields),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmitResult {
    Single(SingleApplyResult),
    Batch(ApplyAllSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitResponse {
    pub result: SubmitResult,
    /// The session, if it stays open for correction or retry.
    pub session: Option<ApplySessionView>,
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinator
// ────────────────────────────────────────────────────────────────────────────

pub struct ApplicationCoordinator {
    store: Arc<JobCandidateStore>,
    resume: Arc<ResumeSlot>,
    service: Arc<dyn ApplicationService>,
    session: Mutex<Option<ApplySession>>,
}

impl ApplicationCoordinator {
    pub fn new(
        store: Arc<JobCandidateStore>,
        resume: Arc<ResumeSlot>,
        service: Arc<dyn ApplicationService>,
    ) -> Self {
        Self {
            store,
            resume,
            service,
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<ApplySession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resume_text(&self) -> Result<String, AppError> {
        self.resume.text().ok_or_else(|| {
            AppError::Configuration(
                "Resume text is missing. Upload a resume before applying.".to_string(),
            )
        })
    }

    /// Applies to one job with the given field values.
    pub async fn apply_single(
        &self,
        job: &JobPosting,
        fields: &FieldValues,
    ) -> Result<SingleApplyResult, AppError> {
        let missing = missing_fields(&job.required_fields, fields);
        if !missing.is_empty() {
            info!("Job {} still needs {:?}; not submitting", job.id, missing);
            let outcome = ApplyOutcome::NeedsInfo {
                missing_fields: missing,
            };
            return Ok(single_result(job, outcome));
        }

        let request = ApplyRequest {
            payload: ApplicationPayload::for_job(job, fields),
            resume_text: self.resume_text()?,
        };

        let outcome = match self.service.apply(&request).await {
            Ok(outcome) => outcome,
            Err(JobsApiError::MissingEndpoint) => return Err(JobsApiError::MissingEndpoint.into()),
            Err(e) => {
                warn!("Application to job {} failed: {e}", job.id);
                ApplyOutcome::Error {
                    reason: e.to_string(),
                }
            }
        };

        if outcome.is_submitted() {
            self.store.mark_applied(&job.id);
            info!("Applied to job {} ({} at {})", job.id, job.title, job.company);
        }

        Ok(single_result(job, outcome))
    }

    /// Applies to every job with one shared set of field values.
    pub async fn apply_all(
        &self,
        jobs: &[JobPosting],
        shared: &FieldValues,
    ) -> Result<ApplyAllSummary, AppError> {
        if jobs.is_empty() {
            return Err(AppError::Validation(
                "There are no visible matches to apply to".to_string(),
            ));
        }

        let request = BatchApplyRequest {
            resume_text: self.resume_text()?,
            jobs: jobs
                .iter()
                .map(|job| ApplicationPayload::for_job(job, shared))
                .collect(),
        };

        // Entries are recorded as they arrive, so a slow job never holds back the rest.
        let (entries, mut arrivals) = mpsc::unbounded_channel();
        let mut tally = BatchTally::new(jobs);
        let (dispatched, ()) = tokio::join!(self.service.apply_all(&request, entries), async {
            while let Some(entry) = arrivals.recv().await {
                tally.record(&self.store, entry);
            }
        });

        let unanswered = match dispatched {
            Ok(()) => "no response for job".to_string(),
            Err(JobsApiError::MissingEndpoint) => return Err(JobsApiError::MissingEndpoint.into()),
            Err(e) => {
                warn!("Batch application request failed: {e}");
                e.to_string()
            }
        };

        let mut summary = tally.finish(&unanswered);
        summary.union_required = union_required(jobs);
        summary.message = summary.describe();
        info!(
            "Apply-all finished: {} submitted, {} need info, {} failed",
            summary.submitted_count(),
            summary.needs_info_count(),
            summary.failed.len()
        );
        Ok(summary)
    }

    // ── Sessions ────────────────────────────────────────────────────────────

    /// Opens a single-apply session, replacing any open session.
    pub fn open_single(&self, job: JobPosting) -> ApplySessionView {
        let profile = self.resume.profile();
        let session = ApplySession {
            id: Uuid::new_v4(),
            fields: prefill_single(&job.required_fields, profile.as_ref()),
            required: job.required_fields.clone(),
            kind: SessionKind::Single(job),
            status: None,
        };
        self.replace_session(session)
    }

    /// Opens an apply-all session over `visible`, replacing any open session.
    pub fn open_batch(&self, visible: Vec<JobPosting>) -> Result<ApplySessionView, AppError> {
        if visible.is_empty() {
            return Err(AppError::Validation(
                "There are no visible matches to apply to".to_string(),
            ));
        }
        let required = union_required(&visible);
        let profile = self.resume.profile();
        let session = ApplySession {
            id: Uuid::new_v4(),
            fields: prefill_batch(&required, profile.as_ref()),
            required,
            kind: SessionKind::Batch { pending: visible },
            status: None,
        };
        Ok(self.replace_session(session))
    }

    fn replace_session(&self, session: ApplySession) -> ApplySessionView {
        let view = session.view();
        if let Some(previous) = self.session().replace(session) {
            debug!(
                "Apply session {} replaced by {}; {} typed field(s) discarded",
                previous.id,
                view.id,
                previous.fields.len()
            );
        }
        view
    }

    pub fn view(&self) -> Option<ApplySessionView> {
        self.session().as_ref().map(ApplySession::view)
    }

    /// Merges field values into the open session.
    pub fn set_fields(&self, values: FieldValues) -> Result<ApplySessionView, AppError> {
        let mut guard = self.session();
        let session = guard.as_mut().ok_or_else(no_session)?;
        session.fields.extend(values);
        Ok(session.view())
    }

    /// Cancels the open session. Returns false if none was open.
    pub fn close(&self) -> bool {
        self.session().take().is_some()
    }

    /// Submits the open session on a detached task. Dropping the returned future
    /// (a disconnected client) does not cancel the submission: the store and the
    /// session are still updated once the responses arrive.
    pub async fn submit(self: &Arc<Self>) -> Result<SubmitResponse, AppError> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.submit_session().await })
            .await
            .map_err(|e| AppError::Service(format!("Submission task failed: {e}")))?
    }

    /// The lock is released while the request is in flight.
    async fn submit_session(&self) -> Result<SubmitResponse, AppError> {
        let session = self.session().clone().ok_or_else(no_session)?;

        match &session.kind {
            SessionKind::Single(job) => {
                let result = self.apply_single(job, &session.fields).await?;
                let keep_open = !result.outcome.is_submitted();
                let message = result.message.clone();
                let view = self.finish(session.id, keep_open, |s| s.status = Some(message));
                Ok(SubmitResponse {
                    result: SubmitResult::Single(result),
                    session: view,
                })
            }
            SessionKind::Batch { pending } => {
                let summary = self.apply_all(pending, &session.fields).await?;
                let keep_open = summary.is_full_failure() || summary.needs_info_count() > 0;
                let remaining: Vec<JobPosting> = pending
                    .iter()
                    .filter(|job| !summary.submitted.contains(&job.id))
                    .cloned()
                    .collect();
                let message = summary.message.clone();
                let view = self.finish(session.id, keep_open, |s| {
                    s.status = Some(message);
                    s.kind = SessionKind::Batch { pending: remaining };
                });
                Ok(SubmitResponse {
                    result: SubmitResult::Batch(summary),
                    session: view,
                })
            }
        }
    }

    /// Updates or closes the session that submitted, unless it was closed or
    /// replaced while the request was in flight.
    fn finish(
        &self,
        id: Uuid,
        keep_open: bool,
        update: impl FnOnce(&mut ApplySession),
    ) -> Option<ApplySessionView> {
        let mut guard = self.session();
        if guard.as_ref().map(|s| s.id) != Some(id) {
            return None;
        }
        if !keep_open {
            *guard = None;
            return None;
        }
        let session = guard.as_mut()?;
        update(session);
        Some(session.view())
    }
}

impl ApplyHandoff for ApplicationCoordinator {
    fn hand_off(&self, job: &JobPosting) {
        self.open_single(job.clone());
    }
}

/// Running partition of a batch's entries. Submitted jobs are marked applied
/// the moment their entry is recorded.
struct BatchTally<'a> {
    jobs: &'a [JobPosting],
    answered: Vec<String>,
    summary: ApplyAllSummary,
}

impl<'a> BatchTally<'a> {
    fn new(jobs: &'a [JobPosting]) -> Self {
        Self {
            jobs,
            answered: Vec::with_capacity(jobs.len()),
            summary: ApplyAllSummary::default(),
        }
    }

    /// Entries for jobs outside the batch, and repeat entries, are ignored.
    fn record(&mut self, store: &JobCandidateStore, entry: BatchApplyEntry) {
        if !self.jobs.iter().any(|job| job.id == entry.job_id) {
            warn!("Ignoring batch response for unknown job {}", entry.job_id);
            return;
        }
        if self.answered.contains(&entry.job_id) {
            return;
        }
        self.answered.push(entry.job_id.clone());

        match entry.outcome {
            ApplyOutcome::Submitted => {
                store.mark_applied(&entry.job_id);
                self.summary.submitted.push(entry.job_id);
            }
            ApplyOutcome::NeedsInfo { missing_fields } => {
                self.summary.needs_info.push(NeedsInfoEntry {
                    job_id: entry.job_id,
                    missing_fields,
                });
            }
            ApplyOutcome::Error { reason } => self.summary.failed.push(FailedEntry {
                job_id: entry.job_id,
                reason,
            }),
        }
    }

    /// Jobs that never got an entry are reported as failed with `reason`.
    fn finish(mut self, reason: &str) -> ApplyAllSummary {
        for job in self.jobs {
            if !self.answered.contains(&job.id) {
                self.summary.failed.push(FailedEntry {
                    job_id: job.id.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        self.summary
    }
}

fn no_session() -> AppError {
    AppError::Conflict("No apply session is open".to_string())
}

fn single_result(job: &JobPosting, outcome: ApplyOutcome) -> SingleApplyResult {
    let message = match &outcome {
        ApplyOutcome::Submitted => format!("Applied to {} at {}.", job.title, job.company),
        ApplyOutcome::NeedsInfo { missing_fields } if !missing_fields.is_empty() => {
            format!("Still need: {}", missing_fields.join(", "))
        }
        _ => SINGLE_FAILED.to_string(),
    };
    SingleApplyResult {
        job_id: job.id.clone(),
        outcome,
        message,
    }
}
