/// Ranking client: the single point of contact with the recruiting backend.
///
/// Everything the engine knows about jobs, candidates and scoring comes through
/// the `RankingClient` trait. `HttpRankingClient` is the production
/// implementation; tests use the recording fake in `fake`.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Candidate, CandidateUpdate, Job, RankedCandidate};

#[cfg(test)]
pub mod fake;

/// The backend only accepts PDFs under this size.
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cannot reach the backend at {url}. Is it running?")]
    Unreachable { url: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl ClientError {
    /// Errors meaning our local view of jobs/candidates no longer matches the
    /// backend (job deleted, backend restarted with fresh storage).
    pub fn is_stale_state(&self) -> bool {
        match self {
            ClientError::NotFound(_) => true,
            ClientError::Api { message, .. } => {
                let message = message.to_lowercase();
                message.contains("not found") || message.contains("restarted")
            }
            _ => false,
        }
    }
}

/// One resume file handed to `upload_resumes`.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub filename: String,
    pub content: Bytes,
}

impl ResumeFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// PDF by extension and under the backend's size cap.
    pub fn is_acceptable(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf") && self.content.len() < MAX_UPLOAD_BYTES
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RescoreQueued {
    pub queued: u32,
}

#[derive(Debug, Serialize)]
struct RescoreRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_id: Option<&'a str>,
}

/// Request/response facade to the backend.
#[async_trait]
pub trait RankingClient: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<Job>, ClientError>;

    async fn list_candidates(&self, job_id: &str) -> Result<Vec<Candidate>, ClientError>;

    /// Candidates joined with their scoring record.
    async fn list_rankings(&self, job_id: &str) -> Result<Vec<RankedCandidate>, ClientError>;

    /// Returns the full canonical candidate after the update.
    async fn update_candidate(
        &self,
        job_id: &str,
        candidate_id: &str,
        update: &CandidateUpdate,
    ) -> Result<Candidate, ClientError>;

    async fn delete_candidate(&self, job_id: &str, candidate_id: &str) -> Result<(), ClientError>;

    /// Zero accepted files is a valid outcome, not an error.
    async fn upload_resumes(
        &self,
        job_id: &str,
        files: Vec<ResumeFile>,
    ) -> Result<Vec<Candidate>, ClientError>;

    /// Queues one candidate, or every candidate of the job when `candidate_id` is `None`.
    async fn trigger_rescore(
        &self,
        job_id: &str,
        candidate_id: Option<&str>,
    ) -> Result<RescoreQueued, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// `reqwest`-backed client for the backend's REST API.
#[derive(Clone)]
pub struct HttpRankingClient {
    client: Client,
    base_url: Url,
}

impl HttpRankingClient {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("invalid backend URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "backend URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("x-request-id", Uuid::new_v4().to_string())
    }

    /// Sends a request and turns non-2xx responses into `ClientError`s.
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Unreachable {
                    url: self.base_url.to_string(),
                }
            } else {
                ClientError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("{context}: {status}");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("Request failed ({}): {context}", status.as_u16()));
        warn!("{context} returned {status}: {message}");

        if status.as_u16() == 404 {
            return Err(ClientError::NotFound(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(request, context).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(ClientError::Parse)
    }
}

/// Pulls the human-readable message out of an error body.
/// FastAPI-style `{"detail": "..."}` bodies are unwrapped; anything else is used verbatim.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => Some(detail),
        _ => Some(body.to_string()),
    }
}

#[async_trait]
impl RankingClient for HttpRankingClient {
    async fn list_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let url = self.endpoint(&["api", "calibrations"]);
        self.get_json(self.request(Method::GET, url), "list jobs")
            .await
    }

    async fn list_candidates(&self, job_id: &str) -> Result<Vec<Candidate>, ClientError> {
        let url = self.endpoint(&["api", "candidates"]);
        let request = self
            .request(Method::GET, url)
            .query(&[("calibration_id", job_id)]);
        self.get_json(request, "list candidates").await
    }

    async fn list_rankings(&self, job_id: &str) -> Result<Vec<RankedCandidate>, ClientError> {
        let url = self.endpoint(&["api", "calibrations", job_id, "rankings"]);
        self.get_json(self.request(Method::GET, url), "list rankings")
            .await
    }

    async fn update_candidate(
        &self,
        job_id: &str,
        candidate_id: &str,
        update: &CandidateUpdate,
    ) -> Result<Candidate, ClientError> {
        update.validate().map_err(ClientError::Validation)?;
        let url = self.endpoint(&["api", "calibrations", job_id, "candidates", candidate_id]);
        let request = self.request(Method::PATCH, url).json(update);
        self.get_json(request, "update candidate").await
    }

    async fn delete_candidate(&self, job_id: &str, candidate_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "calibrations", job_id, "candidates", candidate_id]);
        self.send(self.request(Method::DELETE, url), "delete candidate")
            .await?;
        Ok(())
    }

    async fn upload_resumes(
        &self,
        job_id: &str,
        files: Vec<ResumeFile>,
    ) -> Result<Vec<Candidate>, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.content.to_vec())
                .file_name(file.filename)
                .mime_str("application/pdf")?;
            form = form.part("files", part);
        }

        let url = self.endpoint(&["api", "upload"]);
        let request = self
            .request(Method::POST, url)
            .query(&[("calibration_id", job_id)])
            .multipart(form);
        self.get_json(request, "upload resumes").await
    }

    async fn trigger_rescore(
        &self,
        job_id: &str,
        candidate_id: Option<&str>,
    ) -> Result<RescoreQueued, ClientError> {
        let url = self.endpoint(&["api", "calibrations", job_id, "rescore"]);
        let request = self
            .request(Method::POST, url)
            .json(&RescoreRequest { candidate_id });
        self.get_json(request, "trigger rescore").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Path, Query},
        http::StatusCode,
        routing::{get, patch, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    async fn spawn_backend() -> String {
        async fn rankings(Path(job_id): Path<String>) -> Json<Value> {
            Json(json!([{
                "id": format!("{job_id}-c1"),
                "name": "Ada Lovelace",
                "parsed_text": "Ada Lovelace\nAnalyst",
                "stage": "Applied",
                "scoring": {"status": "completed", "total_score": 88, "sub_metrics": []}
            }]))
        }

        async fn candidates(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            let job_id = q.get("calibration_id").cloned().unwrap_or_default();
            Json(json!([{"id": "c1", "name": job_id, "parsed_text": ""}]))
        }

        async fn update(
            Path((_job_id, candidate_id)): Path<(String, String)>,
            Json(body): Json<Value>,
        ) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
            if candidate_id == "missing" {
                return Err((
                    StatusCode::NOT_FOUND,
                    Json(json!({"detail": "Candidate not found."})),
                ));
            }
            Ok(Json(json!({
                "id": candidate_id,
                "name": "Ada",
                "parsed_text": "",
                "stage": body["stage"],
            })))
        }

        async fn upload(mut multipart: Multipart) -> Json<Value> {
            let mut created = Vec::new();
            while let Ok(Some(field)) = multipart.next_field().await {
                let name = field.file_name().unwrap_or_default().to_string();
                created.push(json!({"id": name.clone(), "name": name, "parsed_text": ""}));
            }
            Json(Value::Array(created))
        }

        async fn rescore(Json(body): Json<Value>) -> Json<Value> {
            let queued = if body.get("candidate_id").is_some() { 1 } else { 3 };
            Json(json!({"queued": queued}))
        }

        async fn broken() -> (StatusCode, &'static str) {
            (StatusCode::INTERNAL_SERVER_ERROR, "backend restarted")
        }

        let app = Router::new()
            .route("/api/calibrations", get(broken))
            .route("/api/candidates", get(candidates))
            .route("/api/calibrations/:job_id/rankings", get(rankings))
            .route(
                "/api/calibrations/:job_id/candidates/:candidate_id",
                patch(update),
            )
            .route("/api/upload", post(upload))
            .route("/api/calibrations/:job_id/rescore", post(rescore));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> HttpRankingClient {
        HttpRankingClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_error_message_unwraps_detail() {
        assert_eq!(
            error_message(r#"{"detail": "Calibration not found."}"#).as_deref(),
            Some("Calibration not found.")
        );
        assert_eq!(error_message("plain failure").as_deref(), Some("plain failure"));
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_stale_state_detection() {
        assert!(ClientError::NotFound("gone".into()).is_stale_state());
        assert!(ClientError::Api {
            status: 400,
            message: "Calibration Not Found".into()
        }
        .is_stale_state());
        assert!(ClientError::Api {
            status: 500,
            message: "server restarted, please retry".into()
        }
        .is_stale_state());
        assert!(!ClientError::Validation("bad".into()).is_stale_state());
    }

    #[test]
    fn test_resume_file_acceptance() {
        assert!(ResumeFile::new("cv.PDF", vec![1u8, 2, 3]).is_acceptable());
        assert!(!ResumeFile::new("cv.docx", vec![1u8]).is_acceptable());
        assert!(!ResumeFile::new("big.pdf", vec![0u8; MAX_UPLOAD_BYTES]).is_acceptable());
    }

    #[test]
    fn test_endpoint_encodes_segments_and_tolerates_trailing_slash() {
        let c = client("http://localhost:8000/");
        let url = c.endpoint(&["api", "calibrations", "a b/c", "rankings"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/calibrations/a%20b%2Fc/rankings"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpRankingClient::new("not a url", Duration::from_secs(1)),
            Err(ClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_rankings_decodes_scoring() {
        let base = spawn_backend().await;
        let rankings = client(&base).list_rankings("job-1").await.unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].candidate.id, "job-1-c1");
        assert_eq!(rankings[0].scoring.scored_total(), Some(88.0));
    }

    #[tokio::test]
    async fn test_list_candidates_sends_job_query() {
        let base = spawn_backend().await;
        let candidates = client(&base).list_candidates("job-7").await.unwrap();
        assert_eq!(candidates[0].name, "job-7");
    }

    #[tokio::test]
    async fn test_update_returns_canonical_candidate() {
        let base = spawn_backend().await;
        let updated = client(&base)
            .update_candidate("j", "c1", &CandidateUpdate::stage("Interview"))
            .await
            .unwrap();
        assert_eq!(updated.stage.as_deref(), Some("Interview"));
    }

    #[tokio::test]
    async fn test_update_404_maps_to_not_found_with_detail() {
        let base = spawn_backend().await;
        let err = client(&base)
            .update_candidate("j", "missing", &CandidateUpdate::stage("Offer"))
            .await
            .unwrap_err();
        match err {
            ClientError::NotFound(message) => assert_eq!(message, "Candidate not found."),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_update_never_reaches_backend() {
        let c = client("http://127.0.0.1:9");
        let err = c
            .update_candidate("j", "c1", &CandidateUpdate::rating(9))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_server_error_body_becomes_message() {
        let base = spawn_backend().await;
        let err = client(&base).list_jobs().await.unwrap_err();
        assert!(err.is_stale_state(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_upload_sends_each_file_as_part() {
        let base = spawn_backend().await;
        let files = vec![
            ResumeFile::new("a.pdf", b"%PDF-1.4 a".to_vec()),
            ResumeFile::new("b.pdf", b"%PDF-1.4 b".to_vec()),
        ];
        let created = client(&base).upload_resumes("j", files).await.unwrap();
        let ids: Vec<_> = created.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_rescore_single_and_whole_job() {
        let base = spawn_backend().await;
        let c = client(&base);
        assert_eq!(c.trigger_rescore("j", Some("c1")).await.unwrap().queued, 1);
        assert_eq!(c.trigger_rescore("j", None).await.unwrap().queued, 3);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let err = client("http://127.0.0.1:9").list_jobs().await.unwrap_err();
        assert!(
            matches!(err, ClientError::Unreachable { .. } | ClientError::Http(_)),
            "got {err:?}"
        );
    }
}
