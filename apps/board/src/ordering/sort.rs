//! Automatic candidate ordering.
//!
//! `sort_candidates` is a pure function of (candidates, ranking snapshot, mode)
//! and always produces a total order: the primary key, overall score, display
//! name and finally the candidate id are compared in turn, so no two distinct
//! candidates ever compare equal and the output never depends on input order.

use std::cmp::Ordering;
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Candidate, RankedCandidate, ScoringState};
use crate::ordering::sort_mode::SortMode;

/// Score used for candidates with nothing to rank on.
pub const UNSCORED: f64 = -1.0;

/// Ranking records keyed by candidate id.
pub struct RankingIndex<'a> {
    by_id: HashMap<&'a str, &'a ScoringState>,
}

impl<'a> RankingIndex<'a> {
    pub fn new(rankings: &'a [RankedCandidate]) -> Self {
        Self {
            by_id: rankings
                .iter()
                .map(|r| (r.candidate.id.as_str(), &r.scoring))
                .collect(),
        }
    }

    pub fn get(&self, candidate_id: &str) -> Option<&'a ScoringState> {
        self.by_id.get(candidate_id).copied()
    }

    /// Primary sort key for `mode`. Missing or not-yet-completed records score -1.
    pub fn score_of(&self, candidate_id: &str, mode: SortMode) -> f64 {
        let Some(state) = self.get(candidate_id) else {
            return UNSCORED;
        };
        let score = match mode {
            SortMode::Overall | SortMode::Alphabetical => state.scored_total(),
            SortMode::ExperienceYears => state.scored_experience_years(),
            _ => mode
                .sub_metric_key()
                .and_then(|key| state.scored_sub_metric(key))
                .map(|metric| metric.points_earned),
        };
        score.unwrap_or(UNSCORED)
    }

    pub fn overall_of(&self, candidate_id: &str) -> f64 {
        self.get(candidate_id)
            .and_then(ScoringState::scored_total)
            .unwrap_or(UNSCORED)
    }
}

/// Accent- and case-insensitive form of a name, the primary alphabetical key.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

struct SortKey<'a> {
    candidate: &'a Candidate,
    score: f64,
    overall: f64,
    folded_name: String,
}

impl SortKey<'_> {
    fn cmp_by_name(&self, other: &Self) -> Ordering {
        self.folded_name
            .cmp(&other.folded_name)
            .then_with(|| {
                self.candidate
                    .display_name()
                    .cmp(other.candidate.display_name())
            })
            .then_with(|| self.candidate.id.cmp(&other.candidate.id))
    }
}

/// Orders `candidates` for `mode`.
///
/// Alphabetical ascends by display name. Every other mode descends by its score,
/// then by overall score, then ascends by display name; unscored candidates
/// therefore collect alphabetically at the tail.
pub fn sort_candidates<'a>(
    candidates: &'a [Candidate],
    rankings: &[RankedCandidate],
    mode: SortMode,
) -> Vec<&'a Candidate> {
    let index = RankingIndex::new(rankings);

    let mut keyed: Vec<SortKey<'a>> = candidates
        .iter()
        .map(|candidate| SortKey {
            candidate,
            score: index.score_of(&candidate.id, mode),
            overall: index.overall_of(&candidate.id),
            folded_name: collation_key(candidate.display_name()),
        })
        .collect();

    if mode == SortMode::Alphabetical {
        keyed.sort_by(|a, b| a.cmp_by_name(b));
    } else {
        keyed.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.overall.total_cmp(&a.overall))
                .then_with(|| a.cmp_by_name(b))
        });
    }

    keyed.into_iter().map(|k| k.candidate).collect()
}
