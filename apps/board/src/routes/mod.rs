pub mod board;
pub mod health;
pub mod jobs;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sync", post(jobs::handle_sync))
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .route("/api/v1/sort-modes", get(jobs::handle_sort_modes))
        // Ordered list view
        .route(
            "/api/v1/jobs/:job_id/candidates",
            get(jobs::handle_list_candidates),
        )
        .route("/api/v1/jobs/:job_id/sort", put(jobs::handle_set_sort))
        .route(
            "/api/v1/jobs/:job_id/sort/revert",
            post(jobs::handle_revert_sort),
        )
        .route(
            "/api/v1/jobs/:job_id/order/move",
            post(jobs::handle_move_in_list),
        )
        .route("/api/v1/jobs/:job_id/resumes", post(jobs::handle_upload))
        .route("/api/v1/jobs/:job_id/rescore", post(jobs::handle_rescore))
        .route(
            "/api/v1/jobs/:job_id/candidates/:candidate_id",
            axum::routing::patch(jobs::handle_update_candidate)
                .delete(jobs::handle_delete_candidate),
        )
        .route(
            "/api/v1/jobs/:job_id/candidates/:candidate_id/notes",
            get(jobs::handle_get_notes).put(jobs::handle_draft_notes),
        )
        .route(
            "/api/v1/jobs/:job_id/candidates/:candidate_id/notes/commit",
            post(jobs::handle_commit_notes),
        )
        // Pipeline board
        .route("/api/v1/jobs/:job_id/board", get(board::handle_board))
        .route(
            "/api/v1/jobs/:job_id/candidates/:candidate_id/stage",
            post(board::handle_move_to_stage),
        )
        .route("/api/v1/board/drop", post(board::handle_drop))
        .with_state(state)
}
