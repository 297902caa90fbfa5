pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resume", put(handlers::handle_set_resume))
        // Candidates
        .route("/api/v1/jobs", get(handlers::handle_get_jobs))
        .route("/api/v1/jobs/search", post(handlers::handle_search))
        .route("/api/v1/jobs/filters", patch(handlers::handle_update_filters))
        .route(
            "/api/v1/jobs/:id/bookmark",
            post(handlers::handle_toggle_bookmark),
        )
        .route("/api/v1/jobs/:id/dismiss", post(handlers::handle_dismiss))
        // Swipe overlay
        .route("/api/v1/swipe", get(handlers::handle_swipe_view))
        .route("/api/v1/swipe/open", post(handlers::handle_swipe_open))
        .route("/api/v1/swipe/close", post(handlers::handle_swipe_close))
        .route(
            "/api/v1/swipe/pointer-down",
            post(handlers::handle_pointer_down),
        )
        .route(
            "/api/v1/swipe/pointer-move",
            post(handlers::handle_pointer_move),
        )
        .route("/api/v1/swipe/pointer-up", post(handlers::handle_pointer_up))
        .route(
            "/api/v1/swipe/pointer-leave",
            post(handlers::handle_pointer_leave),
        )
        .route("/api/v1/swipe/decide", post(handlers::handle_swipe_decide))
        // Applications
        .route(
            "/api/v1/applications/single",
            post(handlers::handle_open_single),
        )
        .route(
            "/api/v1/applications/batch",
            post(handlers::handle_open_batch),
        )
        .route(
            "/api/v1/applications/session",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/applications/session/fields",
            patch(handlers::handle_set_fields),
        )
        .route(
            "/api/v1/applications/session/submit",
            post(handlers::handle_submit),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::jobs::filters::SearchTrigger;
    use crate::jobs_client::{
        ApplicationService, ApplyOutcome, ApplyRequest, JobSearchService, JobsApiError,
        SearchRequest, SearchResponse,
    };
    use crate::models::job::JobPosting;

    struct StaticSearch(Vec<JobPosting>);

    #[async_trait]
    impl JobSearchService for StaticSearch {
        async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, JobsApiError> {
            Ok(SearchResponse {
                jobs: self.0.clone(),
                total_results: self.0.len() as u64,
                filters_used: None,
            })
        }
    }

    struct AlwaysSubmitted;

    #[async_trait]
    impl ApplicationService for AlwaysSubmitted {
        async fn apply(&self, _request: &ApplyRequest) -> Result<ApplyOutcome, JobsApiError> {
            Ok(ApplyOutcome::Submitted)
        }
    }

    fn job(id: &str, required: &[&str]) -> JobPosting {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("Role {id}"),
            "company": "Acme",
            "url": format!("https://jobs.example.com/{id}"),
            "required_fields": required,
        }))
        .unwrap()
    }

    fn app() -> (Router, mpsc::UnboundedReceiver<SearchTrigger>) {
        let search = Arc::new(StaticSearch(vec![
            job("a", &["cover_letter"]),
            job("b", &[]),
        ]));
        let (state, triggers) = AppState::new(Config::default(), search, Arc::new(AlwaysSubmitted));
        (build_router(state), triggers)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn with_matches(app: &Router) {
        let (status, body) = call(
            app,
            Method::PUT,
            "/api/v1/resume",
            Some(json!({ "raw_text": "Backend engineer", "profile": { "summary": "Rust" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["search_requested"], true);

        let (status, body) = call(app, Method::POST, "/api/v1/jobs/search", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _triggers) = app();
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "jobdeck-api");
    }

    #[tokio::test]
    async fn test_search_without_resume_is_configuration_error() {
        let (app, _triggers) = app();
        let (status, body) = call(&app, Method::POST, "/api/v1/jobs/search", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_search_rejects_malformed_filter_body() {
        let (app, _triggers) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/jobs/search")
            .header("content-type", "application/json")
            .body(Body::from("{\"distance_km\": "))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (_, jobs) = call(&app, Method::GET, "/api/v1/jobs", None).await;
        assert_eq!(jobs["filters"]["distance_km"], 50);
    }

    #[tokio::test]
    async fn test_search_body_overrides_stored_filters() {
        let (app, _triggers) = app();
        with_matches(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/jobs/search",
            Some(json!({ "keywords": "rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filters"]["keywords"], "rust");
    }

    #[tokio::test]
    async fn test_filters_patch_is_accepted_and_signals_search() {
        let (app, mut triggers) = app();
        let (status, body) = call(
            &app,
            Method::PATCH,
            "/api/v1/jobs/filters",
            Some(json!({ "distance_km": 500, "employment_type": "internship" })),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["distance_km"], 100);
        assert_eq!(body["employment_type"], "intern");
        let trigger = triggers.try_recv().unwrap();
        assert_eq!(trigger.filters.distance_km, 100);
    }

    #[tokio::test]
    async fn test_dismiss_hides_job_from_listing() {
        let (app, _triggers) = app();
        with_matches(&app).await;

        call(&app, Method::POST, "/api/v1/jobs/a/dismiss", None).await;
        let (_, body) = call(&app, Method::GET, "/api/v1/jobs", None).await;

        let visible: Vec<&str> = body["visible"]
            .as_array()
            .unwrap()
            .iter()
            .map(|j| j["id"].as_str().unwrap())
            .collect();
        assert_eq!(visible, vec!["b"]);
        assert_eq!(body["dismissed"], json!(["a"]));
    }

    #[tokio::test]
    async fn test_swipe_right_bookmarks_and_advances() {
        let (app, _triggers) = app();
        with_matches(&app).await;

        let (_, view) = call(&app, Method::POST, "/api/v1/swipe/open", None).await;
        assert_eq!(view["total"], 2);

        call(&app, Method::POST, "/api/v1/swipe/pointer-down", Some(json!({ "x": 0.0, "y": 0.0 }))).await;
        call(&app, Method::POST, "/api/v1/swipe/pointer-move", Some(json!({ "x": 120.0, "y": 5.0 }))).await;
        let (status, outcome) = call(&app, Method::POST, "/api/v1/swipe/pointer-up", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["decision"]["decision"], "bookmark");
        assert_eq!(outcome["view"]["position"], 2);
        let (_, jobs) = call(&app, Method::GET, "/api/v1/jobs", None).await;
        assert_eq!(jobs["bookmarked"], json!(["a"]));
        assert_eq!(jobs["overlay_open"], true);
    }

    #[tokio::test]
    async fn test_single_apply_session_round_trip() {
        let (app, _triggers) = app();
        with_matches(&app).await;

        let (status, session) = call(
            &app,
            Method::POST,
            "/api/v1/applications/single",
            Some(json!({ "job_id": "a" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["fields"][0]["label"], "Cover Letter");

        let (_, first) = call(&app, Method::POST, "/api/v1/applications/session/submit", None).await;
        assert_eq!(first["result"]["outcome"]["status"], "needs_more_info");
        assert_eq!(first["session"]["status"], "Still need: cover_letter");

        call(
            &app,
            Method::PATCH,
            "/api/v1/applications/session/fields",
            Some(json!({ "cover_letter": "Hello" })),
        )
        .await;
        let (_, second) = call(&app, Method::POST, "/api/v1/applications/session/submit", None).await;
        assert_eq!(second["result"]["message"], "Applied to Role a at Acme.");
        assert!(second["session"].is_null());

        let (_, jobs) = call(&app, Method::GET, "/api/v1/jobs", None).await;
        assert_eq!(jobs["applied"], json!(["a"]));
    }

    #[tokio::test]
    async fn test_open_single_unknown_job_is_not_found() {
        let (app, _triggers) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/applications/single",
            Some(json!({ "job_id": "missing" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_batch_session_needs_matches() {
        let (app, _triggers) = app();
        let (status, _) = call(&app, Method::POST, "/api/v1/applications/batch", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::DELETE, "/api/v1/applications/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
