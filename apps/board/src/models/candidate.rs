use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::scoring::ScoringState;

/// A resume applicant scoped to one job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parsed_text: String,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_filename: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
}

impl Candidate {
    /// Name shown in lists and used for alphabetical ordering.
    ///
    /// The first line of the parsed resume wins when it looks like a person's
    /// name (2-5 purely alphabetic words, under 50 characters); otherwise the
    /// name derived from the upload filename is used.
    pub fn display_name(&self) -> &str {
        let first_line = self
            .parsed_text
            .lines()
            .next()
            .map(str::trim)
            .unwrap_or("");

        let name_words = first_line
            .split_whitespace()
            .filter(|w| w.chars().all(|c| c.is_ascii_alphabetic() || c == '.' || c == '-'))
            .count();

        if (2..=5).contains(&name_words) && first_line.chars().count() < 50 {
            first_line
        } else {
            &self.name
        }
    }
}

/// A candidate together with its asynchronous scoring record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub scoring: ScoringState,
}

/// Partial update sent to the backend. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CandidateUpdate {
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            ..Self::default()
        }
    }

    pub fn rating(rating: u8) -> Self {
        Self {
            rating: Some(rating),
            ..Self::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stage.is_none() && self.rating.is_none() && self.notes.is_none()
    }

    /// Rejects updates the backend would refuse anyway.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("update must set at least one of stage, rating or notes".to_string());
        }
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(format!("rating must be between 1 and 5, got {rating}"));
            }
        }
        if let Some(stage) = &self.stage {
            if stage.trim().is_empty() {
                return Err("stage must not be blank".to_string());
            }
        }
        Ok(())
    }
}
