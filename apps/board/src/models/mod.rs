pub mod candidate;
pub mod job;
pub mod scoring;
pub mod timestamp;

pub use candidate::{Candidate, CandidateUpdate, RankedCandidate};
pub use job::{Job, DEFAULT_STAGES};
pub use scoring::{ScoringState, ScoringStatus, SubMetric};
