use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Candidate, CandidateUpdate, Job};
use crate::ordering::SortMode;
use crate::ranking_client::{RescoreQueued, ResumeFile};
use crate::state::AppState;
use crate::sync::{RenderedList, UploadReport};

#[derive(Deserialize)]
pub struct SortRequest {
    pub mode: String,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub dragged_id: String,
    pub target_id: String,
}

#[derive(Deserialize, Default)]
pub struct RescoreRequest {
    #[serde(default)]
    pub candidate_id: Option<String>,
}

#[derive(Deserialize)]
pub struct NotesDraft {
    pub text: String,
}

#[derive(Serialize)]
pub struct NotesView {
    pub text: String,
}

#[derive(Serialize)]
pub struct SortModeOption {
    pub mode: SortMode,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct NotesCommitResponse {
    pub sent: bool,
    pub candidate: Option<Candidate>,
}

pub(crate) async fn require_job(state: &AppState, job_id: &str) -> Result<Job, AppError> {
    state
        .workspace
        .job(job_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// POST /api/v1/sync
pub async fn handle_sync(State(state): State<AppState>) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.workspace.resync().await?))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.workspace.jobs().await)
}

/// GET /api/v1/jobs/:job_id/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<RenderedList>, AppError> {
    require_job(&state, &job_id).await?;
    Ok(Json(state.workspace.rendered(&job_id).await))
}

/// GET /api/v1/sort-modes
pub async fn handle_sort_modes() -> Json<Vec<SortModeOption>> {
    Json(
        SortMode::ALL
            .into_iter()
            .map(|mode| SortModeOption {
                mode,
                label: mode.label(),
            })
            .collect(),
    )
}

/// PUT /api/v1/jobs/:job_id/sort
pub async fn handle_set_sort(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<SortRequest>,
) -> Result<Json<RenderedList>, AppError> {
    require_job(&state, &job_id).await?;
    let mode: SortMode = req.mode.parse().map_err(AppError::Validation)?;
    Ok(Json(state.workspace.set_sort_mode(&job_id, mode).await))
}

/// POST /api/v1/jobs/:job_id/sort/revert
pub async fn handle_revert_sort(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<RenderedList>, AppError> {
    require_job(&state, &job_id).await?;
    Ok(Json(state.workspace.revert_to_sort_order(&job_id).await))
}

/// POST /api/v1/jobs/:job_id/order/move
/// A no-op drag (onto itself, unknown ids) returns the unchanged list.
pub async fn handle_move_in_list(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<RenderedList>, AppError> {
    require_job(&state, &job_id).await?;
    let rendered = match state
        .workspace
        .move_in_list(&job_id, &req.dragged_id, &req.target_id)
        .await
    {
        Some(rendered) => rendered,
        None => state.workspace.rendered(&job_id).await,
    };
    Ok(Json(rendered))
}

/// POST /api/v1/jobs/:job_id/resumes
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadReport>, AppError> {
    require_job(&state, &job_id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        files.push(ResumeFile::new(filename, content));
    }

    Ok(Json(state.workspace.upload(&job_id, files).await?))
}

/// POST /api/v1/jobs/:job_id/rescore
pub async fn handle_rescore(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<RescoreRequest>,
) -> Result<Json<RescoreQueued>, AppError> {
    require_job(&state, &job_id).await?;
    let queued = state
        .workspace
        .rescore(&job_id, req.candidate_id.as_deref())
        .await?;
    Ok(Json(queued))
}

/// PATCH /api/v1/jobs/:job_id/candidates/:candidate_id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
    Json(update): Json<CandidateUpdate>,
) -> Result<Json<Candidate>, AppError> {
    require_job(&state, &job_id).await?;
    let updated = state
        .workspace
        .update_candidate(&job_id, &candidate_id, update)
        .await?;
    Ok(Json(updated))
}

/// GET /api/v1/jobs/:job_id/candidates/:candidate_id/notes
/// The pending draft when there is one, the saved notes otherwise.
pub async fn handle_get_notes(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
) -> Json<NotesView> {
    Json(NotesView {
        text: state.workspace.notes_text(&job_id, &candidate_id).await,
    })
}

/// PUT /api/v1/jobs/:job_id/candidates/:candidate_id/notes
pub async fn handle_draft_notes(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
    Json(draft): Json<NotesDraft>,
) -> StatusCode {
    state
        .workspace
        .edit_notes(&job_id, &candidate_id, draft.text)
        .await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/jobs/:job_id/candidates/:candidate_id/notes/commit
pub async fn handle_commit_notes(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
) -> Result<Json<NotesCommitResponse>, AppError> {
    let candidate = state.workspace.commit_notes(&job_id, &candidate_id).await?;
    Ok(Json(NotesCommitResponse {
        sent: candidate.is_some(),
        candidate,
    }))
}

/// DELETE /api/v1/jobs/:job_id/candidates/:candidate_id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .workspace
        .delete_candidate(&job_id, &candidate_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
