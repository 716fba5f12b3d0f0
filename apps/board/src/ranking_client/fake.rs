//! Recording in-memory `RankingClient` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ClientError, RankingClient, RescoreQueued, ResumeFile};
use crate::models::{Candidate, CandidateUpdate, Job, RankedCandidate, ScoringState, ScoringStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListJobs,
    ListCandidates(String),
    ListRankings(String),
    Update {
        job_id: String,
        candidate_id: String,
        update: CandidateUpdate,
    },
    Delete {
        job_id: String,
        candidate_id: String,
    },
    Upload {
        job_id: String,
        files: usize,
    },
    Rescore {
        job_id: String,
        candidate_id: Option<String>,
    },
}

#[derive(Default)]
struct Inner {
    jobs: Vec<Job>,
    candidates: HashMap<String, Vec<Candidate>>,
    scoring: HashMap<String, HashMap<String, ScoringState>>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    stale_upload: bool,
    delay: Option<Duration>,
}

#[derive(Default)]
pub struct FakeRankingClient {
    inner: Mutex<Inner>,
}

pub fn job(id: &str, stages: &[&str]) -> Job {
    Job {
        id: id.to_string(),
        requisition_name: format!("{id} requisition"),
        role: "Engineer".to_string(),
        pipeline_stages: if stages.is_empty() {
            None
        } else {
            Some(stages.iter().map(|s| s.to_string()).collect())
        },
        created_at: None,
    }
}

pub fn candidate(id: &str, name: &str, stage: Option<&str>) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        parsed_text: String::new(),
        created_at: None,
        source_filename: Some(format!("{id}.pdf")),
        stage: stage.map(String::from),
        rating: None,
        notes: None,
        ai_summary: None,
    }
}

pub fn scoring(status: ScoringStatus, total: Option<f64>) -> ScoringState {
    ScoringState {
        status,
        total_score: total,
        ..ScoringState::default()
    }
}

impl FakeRankingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(self, job: Job, candidates: Vec<Candidate>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let scores = inner.scoring.entry(job.id.clone()).or_default();
            for c in &candidates {
                scores.insert(c.id.clone(), ScoringState::default());
            }
            inner.candidates.insert(job.id.clone(), candidates);
            inner.jobs.push(job);
        }
        self
    }

    pub fn set_scoring(&self, job_id: &str, candidate_id: &str, state: ScoringState) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .scoring
            .entry(job_id.to_string())
            .or_default()
            .insert(candidate_id.to_string(), state);
    }

    pub fn remove_job(&self, job_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.retain(|j| j.id != job_id);
        inner.candidates.remove(job_id);
        inner.scoring.remove(job_id);
    }

    /// Makes every call of the named operation fail with a 500.
    pub fn fail(&self, operation: &'static str) {
        self.inner.lock().unwrap().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.inner.lock().unwrap().failing.remove(operation);
    }

    /// Next uploads fail the way a backend that lost the job does.
    pub fn lose_jobs_on_upload(&self) {
        self.inner.lock().unwrap().stale_upload = true;
    }

    pub fn delay_responses(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn update_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .collect()
    }

    pub fn ranking_calls(&self, job_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ListRankings(j) if j == job_id))
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    async fn enter(&self, call: Call, operation: &'static str) -> Result<(), ClientError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(call);
            if inner.failing.contains(operation) {
                return Err(ClientError::Api {
                    status: 500,
                    message: format!("{operation} failed"),
                });
            }
            inner.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl RankingClient for FakeRankingClient {
    async fn list_jobs(&self) -> Result<Vec<Job>, ClientError> {
        self.enter(Call::ListJobs, "list_jobs").await?;
        Ok(self.inner.lock().unwrap().jobs.clone())
    }

    async fn list_candidates(&self, job_id: &str) -> Result<Vec<Candidate>, ClientError> {
        self.enter(Call::ListCandidates(job_id.to_string()), "list_candidates")
            .await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.candidates.get(job_id).cloned().unwrap_or_default())
    }

    async fn list_rankings(&self, job_id: &str) -> Result<Vec<RankedCandidate>, ClientError> {
        self.enter(Call::ListRankings(job_id.to_string()), "list_rankings")
            .await?;
        let inner = self.inner.lock().unwrap();
        let scores = inner.scoring.get(job_id);
        Ok(inner
            .candidates
            .get(job_id)
            .map(|list| {
                list.iter()
                    .map(|c| RankedCandidate {
                        candidate: c.clone(),
                        scoring: scores
                            .and_then(|s| s.get(&c.id))
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_candidate(
        &self,
        job_id: &str,
        candidate_id: &str,
        update: &CandidateUpdate,
    ) -> Result<Candidate, ClientError> {
        self.enter(
            Call::Update {
                job_id: job_id.to_string(),
                candidate_id: candidate_id.to_string(),
                update: update.clone(),
            },
            "update_candidate",
        )
        .await?;
        update.validate().map_err(ClientError::Validation)?;

        let mut inner = self.inner.lock().unwrap();
        let candidate = inner
            .candidates
            .get_mut(job_id)
            .and_then(|list| list.iter_mut().find(|c| c.id == candidate_id))
            .ok_or_else(|| ClientError::NotFound("Candidate not found.".to_string()))?;
        if let Some(stage) = &update.stage {
            candidate.stage = Some(stage.clone());
        }
        if let Some(rating) = update.rating {
            candidate.rating = Some(rating);
        }
        if let Some(notes) = &update.notes {
            candidate.notes = Some(notes.clone());
        }
        Ok(candidate.clone())
    }

    async fn delete_candidate(&self, job_id: &str, candidate_id: &str) -> Result<(), ClientError> {
        self.enter(
            Call::Delete {
                job_id: job_id.to_string(),
                candidate_id: candidate_id.to_string(),
            },
            "delete_candidate",
        )
        .await?;
        let mut inner = self.inner.lock().unwrap();
        let list = inner
            .candidates
            .get_mut(job_id)
            .ok_or_else(|| ClientError::NotFound("Calibration not found.".to_string()))?;
        list.retain(|c| c.id != candidate_id);
        if let Some(scores) = inner.scoring.get_mut(job_id) {
            scores.remove(candidate_id);
        }
        Ok(())
    }

    async fn upload_resumes(
        &self,
        job_id: &str,
        files: Vec<ResumeFile>,
    ) -> Result<Vec<Candidate>, ClientError> {
        self.enter(
            Call::Upload {
                job_id: job_id.to_string(),
                files: files.len(),
            },
            "upload_resumes",
        )
        .await?;
        let mut inner = self.inner.lock().unwrap();
        if inner.stale_upload {
            return Err(ClientError::NotFound("Calibration not found.".to_string()));
        }
        let created: Vec<Candidate> = files
            .iter()
            .map(|f| {
                let id = f.filename.trim_end_matches(".pdf").to_string();
                candidate(&id, &id, None)
            })
            .collect();
        let scores = inner.scoring.entry(job_id.to_string()).or_default();
        for c in &created {
            scores.insert(c.id.clone(), ScoringState::default());
        }
        let list = inner.candidates.entry(job_id.to_string()).or_default();
        list.extend(created);
        Ok(list.clone())
    }

    async fn trigger_rescore(
        &self,
        job_id: &str,
        candidate_id: Option<&str>,
    ) -> Result<RescoreQueued, ClientError> {
        self.enter(
            Call::Rescore {
                job_id: job_id.to_string(),
                candidate_id: candidate_id.map(String::from),
            },
            "trigger_rescore",
        )
        .await?;
        let mut inner = self.inner.lock().unwrap();
        let scores = inner.scoring.entry(job_id.to_string()).or_default();
        let mut queued = 0;
        for (id, state) in scores.iter_mut() {
            if candidate_id.map_or(true, |c| c == id) {
                *state = ScoringState::default();
                queued += 1;
            }
        }
        Ok(RescoreQueued { queued })
    }
}
