//! Kanban view of a job's pipeline: stage columns, drag payloads, and the
//! stage transitions a drop or an explicit "Move to" produces.

pub mod board;
pub mod drag;
mod transitions;

pub use board::{columns, effective_stage, move_targets, Card, Column};
pub use drag::{plan_drop, DragTarget, StageMove};
