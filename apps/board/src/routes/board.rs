use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Candidate;
use crate::pipeline::{Column, DragTarget};
use crate::routes::jobs::require_job;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StageRequest {
    pub stage: String,
}

#[derive(Deserialize)]
pub struct DropRequest {
    pub active: DragTarget,
    #[serde(default)]
    pub over: Option<DragTarget>,
}

/// `moved` is null when the request changed nothing.
#[derive(Serialize)]
pub struct MoveResponse {
    pub moved: Option<Candidate>,
}

/// GET /api/v1/jobs/:job_id/board
pub async fn handle_board(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<Column>>, AppError> {
    state
        .workspace
        .board(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// POST /api/v1/jobs/:job_id/candidates/:candidate_id/stage
pub async fn handle_move_to_stage(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
    Json(req): Json<StageRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    require_job(&state, &job_id).await?;
    let moved = state
        .workspace
        .move_to_stage(&job_id, &candidate_id, &req.stage)
        .await?;
    Ok(Json(MoveResponse { moved }))
}

/// POST /api/v1/board/drop
pub async fn handle_drop(
    State(state): State<AppState>,
    Json(req): Json<DropRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let moved = state
        .workspace
        .drop_card(&req.active, req.over.as_ref())
        .await?;
    Ok(Json(MoveResponse { moved }))
}
