use serde::Serialize;

use crate::models::{Candidate, Job};
use crate::pipeline::drag::DragTarget;

/// Column a candidate renders in: its own stage when the job knows it, the
/// job's first stage otherwise.
pub fn effective_stage(candidate: &Candidate, job: &Job) -> String {
    match candidate.stage.as_deref() {
        Some(stage) if job.has_stage(stage) => stage.to_string(),
        _ => job.default_stage(),
    }
}

/// Stages offered by the "Move to" menu: every stage but the current one.
pub fn move_targets(candidate: &Candidate, job: &Job) -> Vec<String> {
    let current = effective_stage(candidate, job);
    job.stages().into_iter().filter(|s| *s != current).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub candidate_id: String,
    pub display_name: String,
    pub rating: Option<u8>,
    pub move_targets: Vec<String>,
    pub drag: DragTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub stage: String,
    pub drop_target: DragTarget,
    pub cards: Vec<Card>,
}

/// Lays candidates out in the job's stage columns, keeping their input order
/// inside each column. Every candidate lands in exactly one column.
pub fn columns(job: &Job, candidates: &[Candidate]) -> Vec<Column> {
    let mut columns: Vec<Column> = job
        .stages()
        .into_iter()
        .map(|stage| Column {
            drop_target: DragTarget::Column {
                job_id: job.id.clone(),
                stage: stage.clone(),
            },
            stage,
            cards: Vec::new(),
        })
        .collect();

    for candidate in candidates {
        let stage = effective_stage(candidate, job);
        let card = Card {
            candidate_id: candidate.id.clone(),
            display_name: candidate.display_name().to_string(),
            rating: candidate.rating,
            move_targets: move_targets(candidate, job),
            drag: DragTarget::Candidate {
                job_id: job.id.clone(),
                candidate_id: candidate.id.clone(),
            },
        };
        if let Some(column) = columns.iter_mut().find(|c| c.stage == stage) {
            column.cards.push(card);
        }
    }
    columns
}
