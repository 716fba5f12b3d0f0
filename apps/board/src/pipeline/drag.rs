use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Candidate, Job};
use crate::pipeline::board::effective_stage;

/// What the pointer carries or hovers over during a drag. Cards and columns
/// are both valid drop targets in the UI, but only columns change stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragTarget {
    Candidate { job_id: String, candidate_id: String },
    Column { job_id: String, stage: String },
}

impl DragTarget {
    pub fn job_id(&self) -> &str {
        match self {
            DragTarget::Candidate { job_id, .. } | DragTarget::Column { job_id, .. } => job_id,
        }
    }
}

/// A stage change to send to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMove {
    pub job_id: String,
    pub candidate_id: String,
    pub from: String,
    pub to: String,
}

/// Decides what a drop does. Anything other than a candidate dropped onto a
/// different stage column of its own job is ignored.
pub fn plan_drop(
    jobs: &[Job],
    candidates_by_job: &HashMap<String, Vec<Candidate>>,
    active: &DragTarget,
    over: Option<&DragTarget>,
) -> Option<StageMove> {
    let DragTarget::Candidate {
        job_id,
        candidate_id,
    } = active
    else {
        debug!("Ignoring drop: dragged item is not a candidate");
        return None;
    };
    let Some(DragTarget::Column {
        job_id: target_job,
        stage,
    }) = over
    else {
        debug!("Ignoring drop of {candidate_id}: not over a stage column");
        return None;
    };
    if target_job != job_id {
        debug!("Ignoring drop of {candidate_id}: column belongs to job {target_job}");
        return None;
    }

    let job = jobs.iter().find(|j| &j.id == job_id)?;
    if !job.has_stage(stage) {
        debug!("Ignoring drop of {candidate_id}: job {job_id} has no stage {stage}");
        return None;
    }
    let Some(candidate) = candidates_by_job
        .get(job_id)
        .and_then(|list| list.iter().find(|c| &c.id == candidate_id))
    else {
        debug!("Ignoring drop: candidate {candidate_id} unknown in job {job_id}");
        return None;
    };

    let from = effective_stage(candidate, job);
    if &from == stage {
        return None;
    }
    Some(StageMove {
        job_id: job_id.clone(),
        candidate_id: candidate_id.clone(),
        from,
        to: stage.clone(),
    })
}
