use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ScoringStatus {
    /// `pending` and `processing` are still moving; the poller watches them.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScoringStatus::Completed | ScoringStatus::Failed)
    }

    /// Short label for list badges.
    pub fn label(self) -> &'static str {
        match self {
            ScoringStatus::Pending => "Queued",
            ScoringStatus::Processing => "Scoring",
            ScoringStatus::Completed => "Scored",
            ScoringStatus::Failed => "Failed",
        }
    }
}

/// One scored dimension (skills, titles, work, education, experience, context).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubMetric {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub rating: u8, // 0 - 5
    #[serde(default)]
    pub points_earned: f64,
    #[serde(default)]
    pub points_possible: f64,
    #[serde(default)]
    pub matched_terms: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

/// Asynchronous AI evaluation of one candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoringState {
    #[serde(default)]
    pub status: ScoringStatus,
    #[serde(default)]
    pub total_score: Option<f64>, // 0 - 100
    #[serde(default)]
    pub experience_years: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub sub_metrics: Vec<SubMetric>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, with = "super::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScoringState {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScoringStatus::Completed
    }

    /// Overall score, only when scoring completed. Stale numbers on a pending,
    /// processing or failed record are ignored.
    pub fn scored_total(&self) -> Option<f64> {
        if self.is_completed() {
            self.total_score
        } else {
            None
        }
    }

    pub fn scored_experience_years(&self) -> Option<f64> {
        if self.is_completed() {
            self.experience_years
        } else {
            None
        }
    }

    pub fn scored_sub_metric(&self, key: &str) -> Option<&SubMetric> {
        if !self.is_completed() {
            return None;
        }
        self.sub_metrics.iter().find(|m| m.key == key)
    }
}
