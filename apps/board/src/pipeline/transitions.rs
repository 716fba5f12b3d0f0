use tracing::{info, warn};

use crate::models::{Candidate, CandidateUpdate};
use crate::pipeline::board::{columns, effective_stage, Column};
use crate::pipeline::drag::{plan_drop, DragTarget};
use crate::ranking_client::ClientError;
use crate::sync::Workspace;

impl Workspace {
    /// Stage columns for a job, cards in rendered list order.
    pub async fn board(&self, job_id: &str) -> Option<Vec<Column>> {
        let job = self.job(job_id).await?;
        let ordered = self.ordered_candidates(job_id).await;
        Some(columns(&job, &ordered))
    }

    /// Explicit "Move to". Moving to the stage the card already sits in sends
    /// nothing and returns `None`.
    pub async fn move_to_stage(
        &self,
        job_id: &str,
        candidate_id: &str,
        stage: &str,
    ) -> Result<Option<Candidate>, ClientError> {
        let current = {
            let state = self.state.read().await;
            let job = state
                .job(job_id)
                .ok_or_else(|| ClientError::NotFound(format!("Job {job_id} not found.")))?;
            if !job.has_stage(stage) {
                return Err(ClientError::Validation(format!(
                    "job {job_id} has no stage {stage}"
                )));
            }
            let candidate = state.candidate(job_id, candidate_id).ok_or_else(|| {
                ClientError::NotFound(format!("Candidate {candidate_id} not found."))
            })?;
            effective_stage(candidate, job)
        };
        if current == stage {
            return Ok(None);
        }
        self.send_stage(job_id, candidate_id, &current, stage).await.map(Some)
    }

    /// Completes a drag on the board. Drops that do not land on another stage
    /// column of the candidate's own job change nothing.
    pub async fn drop_card(
        &self,
        active: &DragTarget,
        over: Option<&DragTarget>,
    ) -> Result<Option<Candidate>, ClientError> {
        let planned = {
            let state = self.state.read().await;
            plan_drop(&state.jobs, &state.candidates_by_job, active, over)
        };
        let Some(planned) = planned else {
            return Ok(None);
        };
        self.send_stage(&planned.job_id, &planned.candidate_id, &planned.from, &planned.to)
            .await
            .map(Some)
    }

    /// The card stays where it was until the backend confirms.
    async fn send_stage(
        &self,
        job_id: &str,
        candidate_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Candidate, ClientError> {
        match self
            .update_candidate(job_id, candidate_id, CandidateUpdate::stage(to))
            .await
        {
            Ok(updated) => {
                info!("Moved candidate {candidate_id} in job {job_id}: {from} -> {to}");
                Ok(updated)
            }
            Err(e) => {
                warn!("Moving candidate {candidate_id} to {to} failed: {e}");
                Err(e)
            }
        }
    }
}
