//! Named per-job caches mirroring backend state.
//!
//! Each cache entry is replaced whole or merged through one of the functions
//! below; nothing else writes into them. Entries are keyed by job id and jobs
//! never share entries, so last-write-wins replacement is safe.

use std::collections::{BTreeSet, HashMap};

use crate::models::{Candidate, Job, RankedCandidate};

#[derive(Debug, Default)]
pub struct SyncState {
    pub jobs: Vec<Job>,
    pub candidates_by_job: HashMap<String, Vec<Candidate>>,
    pub rankings_by_job: HashMap<String, Vec<RankedCandidate>>,
}

impl SyncState {
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    /// False once a loaded job list no longer contains `job_id`. Late results
    /// for such a job are dropped instead of resurrecting its caches.
    pub fn accepts(&self, job_id: &str) -> bool {
        self.jobs.is_empty() || self.job(job_id).is_some()
    }

    pub fn candidates(&self, job_id: &str) -> &[Candidate] {
        self.candidates_by_job
            .get(job_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rankings(&self, job_id: &str) -> &[RankedCandidate] {
        self.rankings_by_job
            .get(job_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn candidate(&self, job_id: &str, candidate_id: &str) -> Option<&Candidate> {
        self.candidates(job_id).iter().find(|c| c.id == candidate_id)
    }

    /// Installs a fresh job list and returns the ids of jobs that vanished.
    /// Their caches are cleared here; callers clear the rest of their state.
    pub fn replace_jobs(&mut self, jobs: Vec<Job>) -> Vec<String> {
        let removed: Vec<String> = self
            .jobs
            .iter()
            .filter(|old| !jobs.iter().any(|j| j.id == old.id))
            .map(|old| old.id.clone())
            .collect();
        for job_id in &removed {
            self.forget_job(job_id);
        }
        self.jobs = jobs;
        removed
    }

    pub fn forget_job(&mut self, job_id: &str) {
        self.jobs.retain(|j| j.id != job_id);
        self.candidates_by_job.remove(job_id);
        self.rankings_by_job.remove(job_id);
    }

    pub fn replace_candidates(&mut self, job_id: &str, candidates: Vec<Candidate>) {
        self.candidates_by_job.insert(job_id.to_string(), candidates);
    }

    /// Inserts new candidates and replaces known ones, keeping arrival order.
    pub fn upsert_candidates(&mut self, job_id: &str, incoming: Vec<Candidate>) -> usize {
        let list = self.candidates_by_job.entry(job_id.to_string()).or_default();
        let mut added = 0;
        for candidate in incoming {
            match list.iter_mut().find(|c| c.id == candidate.id) {
                Some(existing) => *existing = candidate,
                None => {
                    list.push(candidate);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn replace_rankings(&mut self, job_id: &str, rankings: Vec<RankedCandidate>) {
        self.rankings_by_job.insert(job_id.to_string(), rankings);
    }

    /// Merges the canonical candidate returned by an update. The ranking record
    /// picks up the pipeline fields; its scoring is left alone.
    pub fn merge_candidate(&mut self, job_id: &str, updated: &Candidate) -> bool {
        let Some(slot) = self
            .candidates_by_job
            .get_mut(job_id)
            .and_then(|list| list.iter_mut().find(|c| c.id == updated.id))
        else {
            return false;
        };
        *slot = updated.clone();

        if let Some(ranked) = self
            .rankings_by_job
            .get_mut(job_id)
            .and_then(|list| list.iter_mut().find(|r| r.candidate.id == updated.id))
        {
            ranked.candidate.stage = updated.stage.clone();
            ranked.candidate.rating = updated.rating;
            ranked.candidate.notes = updated.notes.clone();
        }
        true
    }

    pub fn remove_candidate(&mut self, job_id: &str, candidate_id: &str) {
        if let Some(list) = self.candidates_by_job.get_mut(job_id) {
            list.retain(|c| c.id != candidate_id);
        }
        if let Some(list) = self.rankings_by_job.get_mut(job_id) {
            list.retain(|r| r.candidate.id != candidate_id);
        }
    }

    /// Jobs with at least one pending or processing scoring record.
    pub fn in_flight_jobs(&self) -> BTreeSet<String> {
        self.rankings_by_job
            .iter()
            .filter(|(_, rankings)| rankings.iter().any(|r| !r.scoring.is_terminal()))
            .map(|(job_id, _)| job_id.clone())
            .collect()
    }
}
