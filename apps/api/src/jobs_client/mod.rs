//! Jobs API client: the single point of entry for the upstream job search and
//! job application endpoints.
//!
//! Workflows depend on the `JobSearchService` / `ApplicationService` traits, never
//! on `JobsApiClient` directly, so tests and alternative backends can be swapped in.
//! Response statuses are validated here, once, into `ApplyOutcome`.
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::job::{EmploymentType, FieldValues, JobFilters, JobPosting};

const SEARCH_PATH: &str = "/api/v1/jobs/search";
const APPLY_PATH: &str = "/api/v1/jobs/apply";
const APPLY_ALL_PATH: &str = "/api/v1/jobs/apply-all";

#[derive(Debug, Error)]
pub enum JobsApiError {
    #[error("Jobs API endpoint is not configured")]
    MissingEndpoint,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
}

impl From<&JobFilters> for SearchFilters {
    fn from(filters: &JobFilters) -> Self {
        Self {
            keywords: non_blank(filters.keywords.as_deref()),
            location: non_blank(filters.location.as_deref()),
            distance_km: Some(filters.distance_km),
            employment_type: match filters.employment_type {
                EmploymentType::Any => None,
                other => Some(other),
            },
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub resume_text: String,
    pub limit: u8,
    pub filters: SearchFilters,
}

impl SearchRequest {
    pub fn new(resume_text: &str, limit: u8, filters: &JobFilters) -> Self {
        Self {
            resume_text: resume_text.to_string(),
            limit,
            filters: SearchFilters::from(filters),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobPosting>,
    #[serde(default)]
    pub total_results: u64,
    /// Echo of the filters the search backend actually applied. Kept opaque:
    /// the backend may report filters this service does not model.
    #[serde(default)]
    pub filters_used: Option<serde_json::Value>,
}

/// Per-job part of an application request, shared by the single and batch endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPayload {
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    pub apply_url: String,
    pub required_fields: Vec<String>,
    pub provided_fields: FieldValues,
}

impl ApplicationPayload {
    pub fn for_job(job: &JobPosting, provided_fields: &FieldValues) -> Self {
        Self {
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            apply_url: job.url.clone(),
            required_fields: job.required_fields.clone(),
            provided_fields: provided_fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyRequest {
    #[serde(flatten)]
    pub payload: ApplicationPayload,
    pub resume_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchApplyRequest {
    pub resume_text: String,
    pub jobs: Vec<ApplicationPayload>,
}

#[derive(Debug, Deserialize)]
struct ApplyResponseBody {
    #[serde(default)]
    job_id: Option<String>,
    status: String,
    #[serde(default)]
    missing_fields: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: serde_json::Value,
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// The closed set of results an application request can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Submitted,
    #[serde(rename = "needs_more_info")]
    NeedsInfo { missing_fields: Vec<String> },
    Error { reason: String },
}

impl ApplyOutcome {
    /// Maps a wire status onto the closed outcome set. Unknown statuses are errors.
    pub fn from_wire(status: &str, missing_fields: Vec<String>, message: Option<String>) -> Self {
        match status {
            "submitted" => Self::Submitted,
            "needs_more_info" => Self::NeedsInfo { missing_fields },
            "error" => Self::Error {
                reason: message.unwrap_or_else(|| "application service reported an error".into()),
            },
            other => Self::Error {
                reason: format!("unexpected application status '{other}'"),
            },
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

impl From<ApplyResponseBody> for ApplyOutcome {
    fn from(body: ApplyResponseBody) -> Self {
        ApplyOutcome::from_wire(&body.status, body.missing_fields, body.message)
    }
}

/// One tagged entry of a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchApplyEntry {
    pub job_id: String,
    pub outcome: ApplyOutcome,
}

// ────────────────────────────────────────────────────────────────────────────
// Service traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait JobSearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, JobsApiError>;
}

#[async_trait]
pub trait ApplicationService: Send + Sync {
    async fn apply(&self, request: &ApplyRequest) -> Result<ApplyOutcome, JobsApiError>;

    /// Applies to every job in the batch, sending each entry on `entries` as soon
    /// as it resolves. The default fans out one `apply` per job, concurrently; a
    /// failed request becomes an `Error` entry for that job only.
    async fn apply_all(
        &self,
        request: &BatchApplyRequest,
        entries: mpsc::UnboundedSender<BatchApplyEntry>,
    ) -> Result<(), JobsApiError> {
        let mut pending: FuturesUnordered<_> = request
            .jobs
            .iter()
            .map(|payload| async move {
                let single = ApplyRequest {
                    payload: payload.clone(),
                    resume_text: request.resume_text.clone(),
                };
                (payload.job_id.clone(), self.apply(&single).await)
            })
            .collect();

        while let Some((job_id, result)) = pending.next().await {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(JobsApiError::MissingEndpoint) => return Err(JobsApiError::MissingEndpoint),
                Err(e) => ApplyOutcome::Error {
                    reason: e.to_string(),
                },
            };
            if entries.send(BatchApplyEntry { job_id, outcome }).is_err() {
                debug!("Batch entry receiver dropped; remaining requests still run");
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// HTTP client for the upstream Jobs API. A missing base URL is not a startup
/// failure: every call reports `MissingEndpoint` instead.
#[derive(Clone)]
pub struct JobsApiClient {
    client: Client,
    base_url: Option<String>,
}

impl JobsApiClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, JobsApiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, JobsApiError> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(JobsApiError::MissingEndpoint)?;
        Ok(format!("{}{}", base.trim_end_matches('/'), path))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, JobsApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Jobs API returned {} for {}", status, path);
            return Err(JobsApiError::Api {
                status: status.as_u16(),
                message: error_detail(body),
            });
        }

        Ok(response.json().await?)
    }
}

/// Pulls `detail` out of a FastAPI-style error body, falling back to the raw body.
fn error_detail(body: String) -> String {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ApiErrorBody { detail }) => detail.to_string(),
        Err(_) => body,
    }
}

#[async_trait]
impl JobSearchService for JobsApiClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, JobsApiError> {
        let response: SearchResponse = self.post_json(SEARCH_PATH, request).await?;
        debug!(
            "Job search returned {} jobs ({} total)",
            response.jobs.len(),
            response.total_results
        );
        Ok(response)
    }
}

#[async_trait]
impl ApplicationService for JobsApiClient {
    async fn apply(&self, request: &ApplyRequest) -> Result<ApplyOutcome, JobsApiError> {
        let body: ApplyResponseBody = self.post_json(APPLY_PATH, request).await?;
        Ok(body.into())
    }

    async fn apply_all(
        &self,
        request: &BatchApplyRequest,
        entries: mpsc::UnboundedSender<BatchApplyEntry>,
    ) -> Result<(), JobsApiError> {
        let bodies: Vec<ApplyResponseBody> = self.post_json(APPLY_ALL_PATH, request).await?;

        // Entries without a job id cannot be reconciled against the batch.
        for body in bodies {
            let Some(job_id) = body.job_id.clone() else {
                continue;
            };
            let entry = BatchApplyEntry {
                job_id,
                outcome: body.into(),
            };
            if entries.send(entry).is_err() {
                debug!("Batch entry receiver dropped");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let client = JobsApiClient::new(
            Some("http://localhost:8000/".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(SEARCH_PATH).unwrap(),
            "http://localhost:8000/api/v1/jobs/search"
        );
    }

    #[test]
    fn test_endpoint_missing_base_url() {
        let client = JobsApiClient::new(None, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.endpoint(APPLY_PATH),
            Err(JobsApiError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_from_wire_maps_known_statuses() {
        assert_eq!(
            ApplyOutcome::from_wire("submitted", vec![], None),
            ApplyOutcome::Submitted
        );
        assert_eq!(
            ApplyOutcome::from_wire("needs_more_info", vec!["cover_letter".into()], None),
            ApplyOutcome::NeedsInfo {
                missing_fields: vec!["cover_letter".into()]
            }
        );
        assert!(matches!(
            ApplyOutcome::from_wire("error", vec![], Some("portal down".into())),
            ApplyOutcome::Error { reason } if reason == "portal down"
        ));
    }

    #[test]
    fn test_from_wire_unknown_status_is_error() {
        assert!(matches!(
            ApplyOutcome::from_wire("queued", vec![], None),
            ApplyOutcome::Error { .. }
        ));
    }

    #[test]
    fn test_search_filters_omit_blank_and_any() {
        let filters = JobFilters {
            keywords: Some("  ".to_string()),
            location: Some(" Berlin ".to_string()),
            distance_km: 25,
            employment_type: EmploymentType::Any,
        };
        let wire = serde_json::to_value(SearchFilters::from(&filters)).unwrap();
        assert_eq!(wire, json!({ "location": "Berlin", "distance_km": 25 }));
    }

    #[test]
    fn test_apply_request_flattens_payload() {
        let job = JobPosting {
            id: "j1".to_string(),
            title: "SRE".to_string(),
            company: "Acme".to_string(),
            location: None,
            salary: None,
            description: None,
            url: "https://acme.example/apply".to_string(),
            source: "Adzuna".to_string(),
            posted_at: None,
            similarity_score: Some(0.9),
            required_fields: vec!["availability".to_string()],
        };
        let mut fields = FieldValues::new();
        fields.insert("availability".to_string(), "2 weeks".to_string());

        let request = ApplyRequest {
            payload: ApplicationPayload::for_job(&job, &fields),
            resume_text: "resume".to_string(),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["job_id"], "j1");
        assert_eq!(wire["apply_url"], "https://acme.example/apply");
        assert_eq!(wire["resume_text"], "resume");
        assert_eq!(wire["provided_fields"]["availability"], "2 weeks");
    }

    #[test]
    fn test_error_detail_prefers_fastapi_detail() {
        assert_eq!(
            error_detail(r#"{"detail": "resume_text required"}"#.to_string()),
            "resume_text required"
        );
        assert_eq!(error_detail("gateway timeout".to_string()), "gateway timeout");
    }

    #[derive(Default)]
    struct ScriptedService {
        outcomes: HashMap<String, Result<ApplyOutcome, u16>>,
        delays: HashMap<String, Duration>,
    }

    #[async_trait]
    impl ApplicationService for ScriptedService {
        async fn apply(&self, request: &ApplyRequest) -> Result<ApplyOutcome, JobsApiError> {
            if let Some(delay) = self.delays.get(&request.payload.job_id) {
                tokio::time::sleep(*delay).await;
            }
            match self.outcomes.get(&request.payload.job_id) {
                Some(Ok(outcome)) => Ok(outcome.clone()),
                Some(Err(status)) => Err(JobsApiError::Api {
                    status: *status,
                    message: "boom".to_string(),
                }),
                None => Ok(ApplyOutcome::Submitted),
            }
        }
    }

    fn payload(id: &str) -> ApplicationPayload {
        ApplicationPayload {
            job_id: id.to_string(),
            job_title: "Engineer".to_string(),
            company: "Acme".to_string(),
            apply_url: "https://acme.example".to_string(),
            required_fields: vec![],
            provided_fields: FieldValues::new(),
        }
    }

    async fn collect_entries(service: &ScriptedService, ids: &[&str]) -> Vec<BatchApplyEntry> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        service
            .apply_all(
                &BatchApplyRequest {
                    resume_text: "resume".to_string(),
                    jobs: ids.iter().map(|id| payload(id)).collect(),
                },
                tx,
            )
            .await
            .unwrap();
        let mut entries = Vec::new();
        while let Some(entry) = rx.recv().await {
            entries.push(entry);
        }
        entries
    }

    fn outcome_of<'a>(entries: &'a [BatchApplyEntry], job_id: &str) -> &'a ApplyOutcome {
        &entries
            .iter()
            .find(|e| e.job_id == job_id)
            .expect("entry for job")
            .outcome
    }

    #[tokio::test]
    async fn test_default_apply_all_isolates_failures_per_job() {
        let mut outcomes = HashMap::new();
        outcomes.insert("a".to_string(), Ok(ApplyOutcome::Submitted));
        outcomes.insert("b".to_string(), Err(500));
        let service = ScriptedService {
            outcomes,
            ..Default::default()
        };

        let entries = collect_entries(&service, &["a", "b", "c"]).await;

        assert_eq!(entries.len(), 3);
        assert_eq!(outcome_of(&entries, "a"), &ApplyOutcome::Submitted);
        assert!(matches!(outcome_of(&entries, "b"), ApplyOutcome::Error { .. }));
        assert_eq!(outcome_of(&entries, "c"), &ApplyOutcome::Submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_apply_all_sends_entries_in_completion_order() {
        let mut delays = HashMap::new();
        delays.insert("slow".to_string(), Duration::from_millis(300));
        let service = ScriptedService {
            delays,
            ..Default::default()
        };

        let entries = collect_entries(&service, &["slow", "fast"]).await;

        let order: Vec<&str> = entries.iter().map(|e| e.job_id.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow"]);
    }
}
