use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stages used when a job carries no pipeline configuration of its own.
pub const DEFAULT_STAGES: [&str; 4] = ["Applied", "Screening", "Interview", "Offer"];

/// A requisition ("calibration") as returned by the backend.
/// Read-only here: the form that creates and edits jobs lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub requisition_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub pipeline_stages: Option<Vec<String>>,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Ordered pipeline stages. Never empty.
    pub fn stages(&self) -> Vec<String> {
        match &self.pipeline_stages {
            Some(stages) if !stages.is_empty() => stages.clone(),
            _ => DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The stage a candidate with no (or an unknown) stage sits in.
    pub fn default_stage(&self) -> String {
        match &self.pipeline_stages {
            Some(stages) if !stages.is_empty() => stages[0].clone(),
            _ => DEFAULT_STAGES[0].to_string(),
        }
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        match &self.pipeline_stages {
            Some(stages) if !stages.is_empty() => stages.iter().any(|s| s == stage),
            _ => DEFAULT_STAGES.contains(&stage),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.requisition_name.is_empty() {
            "Job"
        } else {
            &self.requisition_name
        }
    }
}
