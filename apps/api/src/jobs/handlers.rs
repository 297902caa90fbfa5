use std::collections::BTreeSet;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::jobs::coordinator::{ApplySessionView, SubmitResponse};
use crate::jobs::search::SearchStatus;
use crate::jobs::swipe::{Decision, PointerPosition, SwipeDecision, SwipeView};
use crate::models::job::{FieldValues, JobFilters, JobFiltersPatch, JobPosting};
use crate::models::resume::{ResumeContext, ResumeProfile};
use crate::state::AppState;

// ── Resume ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResumeUpload {
    pub raw_text: String,
    #[serde(default)]
    pub profile: ResumeProfile,
}

#[derive(Serialize)]
pub struct ResumeAccepted {
    pub search_requested: bool,
}

/// PUT /api/v1/resume
/// Replaces the session resume. Kicks off the first search when there are no matches yet.
pub async fn handle_set_resume(
    State(state): State<AppState>,
    Json(req): Json<ResumeUpload>,
) -> Result<Json<ResumeAccepted>, AppError> {
    if req.raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text must not be empty".to_string()));
    }
    state.resume.set(ResumeContext {
        raw_text: req.raw_text,
        profile: req.profile,
    });

    let search_requested =
        state.store.snapshot().matches.is_empty() && state.filters.request_refresh();
    info!("Resume updated (initial search requested: {search_requested})");
    Ok(Json(ResumeAccepted { search_requested }))
}

// ── Candidates ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct JobsResponse {
    pub visible: Vec<JobPosting>,
    pub total_matches: usize,
    pub filters: JobFilters,
    pub bookmarked: BTreeSet<String>,
    pub applied: BTreeSet<String>,
    pub dismissed: BTreeSet<String>,
    pub overlay_open: bool,
    pub search: SearchStatus,
    pub search_limit: u8,
}

/// GET /api/v1/jobs
pub async fn handle_get_jobs(State(state): State<AppState>) -> Json<JobsResponse> {
    let snapshot = state.store.snapshot();
    Json(JobsResponse {
        visible: snapshot.visible_candidates(),
        total_matches: snapshot.matches.len(),
        filters: snapshot.filters.clone(),
        bookmarked: snapshot.bookmarked.clone(),
        applied: snapshot.applied.clone(),
        dismissed: snapshot.dismissed.clone(),
        overlay_open: snapshot.overlay_open,
        search: state.search.status(),
        search_limit: state.config.search_limit,
    })
}

#[derive(Serialize)]
pub struct SearchResult {
    pub count: usize,
    pub filters: JobFilters,
    pub status: SearchStatus,
}

/// POST /api/v1/jobs/search
/// Searches now and waits for the result. A non-empty body is a filter patch,
/// merged into the stored filters first.
pub async fn handle_search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchResult>, AppError> {
    let filters = match parse_filter_override(&body)? {
        Some(patch) => state.store.set_filters(&patch),
        None => state.store.snapshot().filters.clone(),
    };
    let count = state.search.run(&filters).await?;
    Ok(Json(SearchResult {
        count,
        filters,
        status: state.search.status(),
    }))
}

fn parse_filter_override(body: &[u8]) -> Result<Option<JobFiltersPatch>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::Validation(format!("Invalid filter body: {e}")))
}

/// PATCH /api/v1/jobs/filters
/// The re-search runs in the background; poll GET /api/v1/jobs for its status.
pub async fn handle_update_filters(
    State(state): State<AppState>,
    Json(patch): Json<JobFiltersPatch>,
) -> (StatusCode, Json<JobFilters>) {
    let merged = state.filters.update_filters(&patch);
    (StatusCode::ACCEPTED, Json(merged))
}

#[derive(Serialize)]
pub struct BookmarkResponse {
    pub job_id: String,
    pub bookmarked: bool,
}

/// POST /api/v1/jobs/:id/bookmark
pub async fn handle_toggle_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<BookmarkResponse> {
    let bookmarked = state.store.toggle_bookmark(&id);
    Json(BookmarkResponse {
        job_id: id,
        bookmarked,
    })
}

/// POST /api/v1/jobs/:id/dismiss
pub async fn handle_dismiss(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<JobPosting>> {
    state.store.dismiss(&id);
    Json(state.store.visible_candidates())
}

// ── Swipe ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SwipeOutcome {
    pub decision: Option<SwipeDecision>,
    pub view: SwipeView,
    /// Apply session opened by an upward swipe.
    pub session: Option<ApplySessionView>,
}

#[derive(Deserialize)]
pub struct DecideRequest {
    pub decision: Decision,
}

/// GET /api/v1/swipe
pub async fn handle_swipe_view(State(state): State<AppState>) -> Json<SwipeView> {
    Json(state.swipe().view())
}

/// POST /api/v1/swipe/open
pub async fn handle_swipe_open(State(state): State<AppState>) -> Json<SwipeView> {
    let mut swipe = state.swipe();
    swipe.open(&state.store);
    Json(swipe.view())
}

/// POST /api/v1/swipe/close
pub async fn handle_swipe_close(State(state): State<AppState>) -> Json<SwipeView> {
    let mut swipe = state.swipe();
    swipe.close(&state.store);
    Json(swipe.view())
}

/// POST /api/v1/swipe/pointer-down
pub async fn handle_pointer_down(
    State(state): State<AppState>,
    Json(at): Json<PointerPosition>,
) -> Json<SwipeView> {
    let mut swipe = state.swipe();
    swipe.pointer_down(at);
    Json(swipe.view())
}

/// POST /api/v1/swipe/pointer-move
pub async fn handle_pointer_move(
    State(state): State<AppState>,
    Json(at): Json<PointerPosition>,
) -> Json<SwipeView> {
    let mut swipe = state.swipe();
    swipe.pointer_move(at);
    Json(swipe.view())
}

/// POST /api/v1/swipe/pointer-leave
pub async fn handle_pointer_leave(State(state): State<AppState>) -> Json<SwipeView> {
    let mut swipe = state.swipe();
    swipe.pointer_leave();
    Json(swipe.view())
}

/// POST /api/v1/swipe/pointer-up
pub async fn handle_pointer_up(State(state): State<AppState>) -> Json<SwipeOutcome> {
    let mut swipe = state.swipe();
    let decision = swipe.pointer_up(&state.store, state.applications.as_ref());
    Json(swipe_outcome(&state, decision, swipe.view()))
}

/// POST /api/v1/swipe/decide
pub async fn handle_swipe_decide(
    State(state): State<AppState>,
    Json(req): Json<DecideRequest>,
) -> Json<SwipeOutcome> {
    let mut swipe = state.swipe();
    let decision = swipe.decide(req.decision, &state.store, state.applications.as_ref());
    Json(swipe_outcome(&state, decision, swipe.view()))
}

fn swipe_outcome(state: &AppState, decision: Option<SwipeDecision>, view: SwipeView) -> SwipeOutcome {
    let session = match &decision {
        Some(SwipeDecision {
            decision: Decision::Apply,
            ..
        }) => state.applications.view(),
        _ => None,
    };
    SwipeOutcome {
        decision,
        view,
        session,
    }
}

// ── Applications ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SingleApplyRequest {
    pub job_id: String,
}

/// POST /api/v1/applications/single
pub async fn handle_open_single(
    State(state): State<AppState>,
    Json(req): Json<SingleApplyRequest>,
) -> Result<Json<ApplySessionView>, AppError> {
    let job = state
        .store
        .snapshot()
        .find_match(&req.job_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", req.job_id)))?;
    Ok(Json(state.applications.open_single(job)))
}

/// POST /api/v1/applications/batch
pub async fn handle_open_batch(
    State(state): State<AppState>,
) -> Result<Json<ApplySessionView>, AppError> {
    let view = state
        .applications
        .open_batch(state.store.visible_candidates())?;
    Ok(Json(view))
}

/// GET /api/v1/applications/session
pub async fn handle_get_session(
    State(state): State<AppState>,
) -> Result<Json<ApplySessionView>, AppError> {
    state
        .applications
        .view()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No apply session is open".to_string()))
}

/// PATCH /api/v1/applications/session/fields
pub async fn handle_set_fields(
    State(state): State<AppState>,
    Json(values): Json<FieldValues>,
) -> Result<Json<ApplySessionView>, AppError> {
    Ok(Json(state.applications.set_fields(values)?))
}

/// POST /api/v1/applications/session/submit
pub async fn handle_submit(
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, AppError> {
    Ok(Json(state.applications.submit().await?))
}

/// DELETE /api/v1/applications/session
pub async fn handle_close_session(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.applications.close() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("No apply session is open".to_string()))
    }
}
