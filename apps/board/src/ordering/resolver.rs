use std::collections::HashMap;

use crate::models::{Candidate, RankedCandidate};
use crate::ordering::manual::{reconcile_order, BoardPreferences};
use crate::ordering::sort::sort_candidates;

/// The order actually rendered for a job.
///
/// Without a manual override this is the automatic order for the current sort
/// mode. With one, the stored manual order is reconciled against the live set
/// (newcomers appended in automatic order) and mapped back to candidates, so
/// every live candidate appears exactly once either way.
pub fn resolve_order<'a>(
    candidates: &'a [Candidate],
    rankings: &[RankedCandidate],
    prefs: &BoardPreferences,
) -> Vec<&'a Candidate> {
    let automatic = sort_candidates(candidates, rankings, prefs.sort_mode);
    if !prefs.manual_override {
        return automatic;
    }

    let automatic_ids: Vec<String> = automatic.iter().map(|c| c.id.clone()).collect();
    let by_id: HashMap<&str, &'a Candidate> = automatic
        .iter()
        .map(|c| (c.id.as_str(), *c))
        .collect();

    reconcile_order(&prefs.manual_order, &automatic_ids)
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .collect()
}
