use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Criterion for the automatic candidate order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Overall,
    Alphabetical,
    ExperienceYears,
    Skills,
    Titles,
    Work,
    Education,
    Experience,
    Context,
}

impl SortMode {
    pub const ALL: [SortMode; 9] = [
        SortMode::Overall,
        SortMode::Skills,
        SortMode::Titles,
        SortMode::Work,
        SortMode::Education,
        SortMode::Experience,
        SortMode::Context,
        SortMode::ExperienceYears,
        SortMode::Alphabetical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Overall => "overall",
            SortMode::Alphabetical => "alphabetical",
            SortMode::ExperienceYears => "experience_years",
            SortMode::Skills => "skills",
            SortMode::Titles => "titles",
            SortMode::Work => "work",
            SortMode::Education => "education",
            SortMode::Experience => "experience",
            SortMode::Context => "context",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Overall => "Rank by overall score",
            SortMode::Alphabetical => "Alphabetical",
            SortMode::ExperienceYears => "Years of experience",
            SortMode::Skills => "Skill relevance score",
            SortMode::Titles => "Title relevance score",
            SortMode::Work => "Work relevance score",
            SortMode::Education => "School relevance score",
            SortMode::Experience => "Experience relevance score",
            SortMode::Context => "JD/Ideal relevance score",
        }
    }

    /// Sub-metric key this mode sorts by, if it is a sub-metric mode.
    pub fn sub_metric_key(self) -> Option<&'static str> {
        match self {
            SortMode::Skills
            | SortMode::Titles
            | SortMode::Work
            | SortMode::Education
            | SortMode::Experience
            | SortMode::Context => Some(self.as_str()),
            _ => None,
        }
    }

    /// Decodes a persisted value, accepting the short forms older sessions wrote
    /// (`score`, `alpha`).
    pub fn from_persisted(raw: &str) -> Option<SortMode> {
        match raw.trim() {
            "score" => Some(SortMode::Overall),
            "alpha" => Some(SortMode::Alphabetical),
            other => other.parse().ok(),
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown sort mode '{s}'"))
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
