use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::models::{Candidate, CandidateUpdate, Job, ScoringStatus};
use crate::ordering::sort::RankingIndex;
use crate::ordering::{resolve_order, sort_candidates, BoardPreferences, ManualOrderStore, SortMode};
use crate::persistence::KvStore;
use crate::pipeline::effective_stage;
use crate::ranking_client::{ClientError, RankingClient, RescoreQueued, ResumeFile};
use crate::sync::cache::SyncState;
use crate::sync::notes::NotesBuffer;

const NOTHING_ACCEPTED: &str = "No new resumes added (only PDFs under 15MB are accepted)";

/// One row of the rendered candidate list.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub candidate_id: String,
    pub display_name: String,
    pub stage: Option<String>,
    pub rating: Option<u8>,
    pub status: ScoringStatus,
    pub status_label: &'static str,
    /// Only present once scoring completed.
    pub total_score: Option<f64>,
    pub experience_years: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedList {
    pub job_id: String,
    pub preferences: BoardPreferences,
    pub entries: Vec<ListEntry>,
}

impl RenderedList {
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.candidate_id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub queued: usize,
    pub skipped: usize,
    pub message: String,
}

/// Shared handle over the backend and the local caches.
///
/// Every network call runs without holding the state lock and is bounded by
/// `request_timeout`. Results are merged afterwards through `SyncState`.
pub struct Workspace {
    pub(crate) client: Arc<dyn RankingClient>,
    pub(crate) orders: ManualOrderStore,
    pub(crate) state: RwLock<SyncState>,
    pub(crate) notes: NotesBuffer,
    in_flight: watch::Sender<BTreeSet<String>>,
    request_timeout: Duration,
}

impl Workspace {
    pub fn new(
        client: Arc<dyn RankingClient>,
        store: Arc<dyn KvStore>,
        request_timeout: Duration,
    ) -> Self {
        let (in_flight, _) = watch::channel(BTreeSet::new());
        Self {
            client,
            orders: ManualOrderStore::new(store),
            state: RwLock::new(SyncState::default()),
            notes: NotesBuffer::default(),
            in_flight,
            request_timeout,
        }
    }

    /// Jobs that currently have pending or processing scoring records.
    pub fn subscribe_in_flight(&self) -> watch::Receiver<BTreeSet<String>> {
        self.in_flight.subscribe()
    }

    pub(crate) fn publish_in_flight(&self, state: &SyncState) {
        let next = state.in_flight_jobs();
        self.in_flight.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!("In-flight scoring jobs: {:?}", next);
            *current = next;
            true
        });
    }

    pub(crate) async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout {
                operation,
                after_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.read().await.jobs.clone()
    }

    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.state.read().await.job(job_id).cloned()
    }

    /// Reloads everything: the job list, then candidates and rankings of each
    /// job. Jobs that vanished from the backend are forgotten locally.
    pub async fn resync(&self) -> Result<Vec<Job>, ClientError> {
        let jobs = self.timed("list jobs", self.client.list_jobs()).await?;

        let removed = {
            let mut state = self.state.write().await;
            let removed = state.replace_jobs(jobs.clone());
            self.publish_in_flight(&state);
            removed
        };
        for job_id in &removed {
            info!("Job {job_id} no longer exists, dropping local state");
            self.forget_local(job_id).await;
        }

        join_all(jobs.iter().map(|job| self.load_job(&job.id))).await;
        info!("Synced {} jobs", jobs.len());
        Ok(jobs)
    }

    /// Candidates then a silent ranking refresh for one job. A failed
    /// candidate fetch keeps whatever was cached.
    pub async fn load_job(&self, job_id: &str) {
        let loaded = match self
            .timed("list candidates", self.client.list_candidates(job_id))
            .await
        {
            Ok(candidates) => {
                let mut state = self.state.write().await;
                if state.accepts(job_id) {
                    state.replace_candidates(job_id, candidates);
                    true
                } else {
                    false
                }
            }
            Err(e) => {
                warn!("Could not load candidates for job {job_id}: {e}");
                false
            }
        };

        if let Err(e) = self.refresh_rankings(job_id, true).await {
            warn!("Ranking refresh for job {job_id} failed: {e}");
        }
        if loaded {
            self.sync_manual_order(job_id).await;
        }
    }

    /// Replaces the job's ranking snapshot with a fresh fetch.
    ///
    /// A silent failure keeps the existing snapshot (or records an empty one
    /// when there was none) and reports success. A non-silent failure leaves
    /// the state untouched and returns the error.
    pub async fn refresh_rankings(&self, job_id: &str, silent: bool) -> Result<(), ClientError> {
        match self
            .timed("list rankings", self.client.list_rankings(job_id))
            .await
        {
            Ok(rankings) => {
                let mut state = self.state.write().await;
                if !state.accepts(job_id) {
                    debug!("Dropping rankings for forgotten job {job_id}");
                    return Ok(());
                }
                state.replace_rankings(job_id, rankings);
                self.publish_in_flight(&state);
                Ok(())
            }
            Err(e) if silent => {
                debug!("Silent ranking refresh for job {job_id} failed: {e}");
                let mut state = self.state.write().await;
                if state.accepts(job_id) {
                    state.rankings_by_job.entry(job_id.to_string()).or_default();
                    self.publish_in_flight(&state);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn forget_job(&self, job_id: &str) {
        {
            let mut state = self.state.write().await;
            state.forget_job(job_id);
            self.publish_in_flight(&state);
        }
        self.forget_local(job_id).await;
    }

    async fn forget_local(&self, job_id: &str) {
        self.orders.forget(job_id).await;
        self.notes.discard_job(job_id).await;
    }

    /// Current candidates of a job in rendered order.
    pub async fn ordered_candidates(&self, job_id: &str) -> Vec<Candidate> {
        let prefs = self.orders.preferences(job_id).await;
        let state = self.state.read().await;
        resolve_order(state.candidates(job_id), state.rankings(job_id), &prefs)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn rendered(&self, job_id: &str) -> RenderedList {
        let preferences = self.orders.preferences(job_id).await;
        let state = self.state.read().await;
        let rankings = state.rankings(job_id);
        let index = RankingIndex::new(rankings);
        let job = state.job(job_id);

        let entries = resolve_order(state.candidates(job_id), rankings, &preferences)
            .into_iter()
            .map(|candidate| {
                let scoring = index.get(&candidate.id);
                let status = scoring.map(|s| s.status).unwrap_or_default();
                ListEntry {
                    candidate_id: candidate.id.clone(),
                    display_name: candidate.display_name().to_string(),
                    stage: match job {
                        Some(job) => Some(effective_stage(candidate, job)),
                        None => candidate.stage.clone(),
                    },
                    rating: candidate.rating,
                    status,
                    status_label: status.label(),
                    total_score: scoring.and_then(|s| s.scored_total()),
                    experience_years: scoring.and_then(|s| s.scored_experience_years()),
                }
            })
            .collect();

        RenderedList {
            job_id: job_id.to_string(),
            preferences,
            entries,
        }
    }

    /// Keeps the stored manual order aligned with the live candidate set.
    /// Newcomers are appended in automatic order.
    async fn sync_manual_order(&self, job_id: &str) {
        let mode = self.orders.preferences(job_id).await.sort_mode;
        let automatic: Vec<String> = {
            let state = self.state.read().await;
            sort_candidates(state.candidates(job_id), state.rankings(job_id), mode)
                .iter()
                .map(|c| c.id.clone())
                .collect()
        };
        self.orders.reconcile(job_id, &automatic).await;
    }

    pub async fn set_sort_mode(&self, job_id: &str, mode: SortMode) -> RenderedList {
        self.orders.set_sort_mode(job_id, mode).await;
        self.rendered(job_id).await
    }

    pub async fn revert_to_sort_order(&self, job_id: &str) -> RenderedList {
        self.orders.revert_to_sort_order(job_id).await;
        self.rendered(job_id).await
    }

    /// Drag within the list view: places `dragged_id` before `target_id` in
    /// the currently rendered order and switches the job to manual ordering.
    pub async fn move_in_list(
        &self,
        job_id: &str,
        dragged_id: &str,
        target_id: &str,
    ) -> Option<RenderedList> {
        let rendered = self.rendered(job_id).await.ids();
        self.orders
            .apply_move(job_id, dragged_id, target_id, &rendered)
            .await?;
        Some(self.rendered(job_id).await)
    }

    /// Sends a partial update and merges the canonical result. Invalid
    /// updates, including a stage the job does not have, are rejected before
    /// any network call.
    pub async fn update_candidate(
        &self,
        job_id: &str,
        candidate_id: &str,
        update: CandidateUpdate,
    ) -> Result<Candidate, ClientError> {
        update.validate().map_err(ClientError::Validation)?;
        if let Some(stage) = &update.stage {
            let state = self.state.read().await;
            let job = state
                .job(job_id)
                .ok_or_else(|| ClientError::NotFound(format!("Job {job_id} not found.")))?;
            if !job.has_stage(stage) {
                return Err(ClientError::Validation(format!(
                    "job {job_id} has no stage {stage}"
                )));
            }
        }
        let updated = self
            .timed(
                "update candidate",
                self.client.update_candidate(job_id, candidate_id, &update),
            )
            .await?;

        let mut state = self.state.write().await;
        if state.accepts(job_id) && !state.merge_candidate(job_id, &updated) {
            debug!("Updated candidate {candidate_id} is not cached for job {job_id}");
        }
        Ok(updated)
    }

    pub async fn set_rating(
        &self,
        job_id: &str,
        candidate_id: &str,
        rating: u8,
    ) -> Result<Candidate, ClientError> {
        self.update_candidate(job_id, candidate_id, CandidateUpdate::rating(rating))
            .await
    }

    pub async fn delete_candidate(&self, job_id: &str, candidate_id: &str) -> Result<(), ClientError> {
        self.timed(
            "delete candidate",
            self.client.delete_candidate(job_id, candidate_id),
        )
        .await?;

        {
            let mut state = self.state.write().await;
            state.remove_candidate(job_id, candidate_id);
            self.publish_in_flight(&state);
        }
        self.notes.discard(job_id, candidate_id).await;
        self.sync_manual_order(job_id).await;
        info!("Deleted candidate {candidate_id} from job {job_id}");
        Ok(())
    }

    /// Uploads the acceptable files (PDF, under 15MB). Nothing is sent when no
    /// file qualifies. A failure that means the local view is stale triggers a
    /// full resync before the error is returned.
    pub async fn upload(&self, job_id: &str, files: Vec<ResumeFile>) -> Result<UploadReport, ClientError> {
        let total = files.len();
        let accepted: Vec<ResumeFile> = files.into_iter().filter(ResumeFile::is_acceptable).collect();
        let skipped = total - accepted.len();
        if accepted.is_empty() {
            return Ok(UploadReport {
                queued: 0,
                skipped,
                message: NOTHING_ACCEPTED.to_string(),
            });
        }

        let queued = accepted.len();
        let returned = match self
            .timed("upload resumes", self.client.upload_resumes(job_id, accepted))
            .await
        {
            Ok(returned) => returned,
            Err(e) => {
                if e.is_stale_state() {
                    warn!("Upload to job {job_id} failed on stale state ({e}), resyncing");
                    if let Err(resync_err) = self.resync().await {
                        warn!("Resync after failed upload failed: {resync_err}");
                    }
                }
                return Err(e);
            }
        };

        let job_name = {
            let mut state = self.state.write().await;
            if state.accepts(job_id) {
                state.upsert_candidates(job_id, returned);
            }
            state
                .job(job_id)
                .map(|j| j.display_name().to_string())
                .unwrap_or_else(|| job_id.to_string())
        };
        self.refresh_rankings(job_id, true).await?;
        self.sync_manual_order(job_id).await;

        info!("Queued {queued} resumes for job {job_id} ({skipped} skipped)");
        Ok(UploadReport {
            queued,
            skipped,
            message: format!("{queued} resume(s) queued for scoring in {job_name}"),
        })
    }

    /// Queues a rescore of one candidate or the whole job, then refreshes
    /// rankings so the poller sees the new pending records.
    pub async fn rescore(
        &self,
        job_id: &str,
        candidate_id: Option<&str>,
    ) -> Result<RescoreQueued, ClientError> {
        let queued = self
            .timed(
                "trigger rescore",
                self.client.trigger_rescore(job_id, candidate_id),
            )
            .await?;
        self.refresh_rankings(job_id, true).await?;
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoringState;
    use crate::persistence::{KvStore, MemoryStore};
    use crate::ranking_client::fake::{candidate, job, scoring, Call, FakeRankingClient};
    use crate::ranking_client::MAX_UPLOAD_BYTES;

    fn workspace(fake: FakeRankingClient) -> (Arc<FakeRankingClient>, Workspace) {
        let fake = Arc::new(fake);
        let ws = Workspace::new(
            fake.clone(),
            Arc::new(MemoryStore::new()),
            Duration::from_secs(10),
        );
        (fake, ws)
    }

    fn scored(total: f64) -> ScoringState {
        scoring(ScoringStatus::Completed, Some(total))
    }

    fn three_candidates() -> FakeRankingClient {
        FakeRankingClient::new().with_job(
            job("j", &["Applied", "Interview"]),
            vec![
                candidate("a", "Ann", None),
                candidate("b", "Bob", None),
                candidate("c", "Cy", None),
            ],
        )
    }

    #[tokio::test]
    async fn test_resync_loads_caches_and_publishes_in_flight() {
        let (fake, ws) = workspace(three_candidates());
        fake.set_scoring("j", "a", scored(50.0));
        fake.set_scoring("j", "b", scoring(ScoringStatus::Processing, None));
        fake.set_scoring("j", "c", scored(90.0));

        let jobs = ws.resync().await.unwrap();
        assert_eq!(jobs.len(), 1);

        let rx = ws.subscribe_in_flight();
        assert!(rx.borrow().contains("j"));

        let rendered = ws.rendered("j").await;
        assert_eq!(rendered.ids(), vec!["c", "a", "b"]);
        assert_eq!(rendered.entries[2].status_label, "Scoring");
        assert_eq!(rendered.entries[2].total_score, None);
        assert_eq!(rendered.entries[0].stage.as_deref(), Some("Applied"));
    }

    #[tokio::test]
    async fn test_resync_forgets_vanished_jobs() {
        let fake = three_candidates().with_job(job("k", &[]), vec![candidate("x", "Xi", None)]);
        let (fake, ws) = workspace(fake);
        ws.resync().await.unwrap();
        ws.set_sort_mode("k", SortMode::Alphabetical).await;

        fake.remove_job("k");
        ws.resync().await.unwrap();

        assert!(ws.job("k").await.is_none());
        assert!(ws.rendered("k").await.entries.is_empty());
        assert_eq!(ws.orders.preferences("k").await, BoardPreferences::default());
    }

    #[tokio::test]
    async fn test_silent_refresh_failure_keeps_snapshot() {
        let (fake, ws) = workspace(three_candidates());
        fake.set_scoring("j", "a", scored(40.0));
        ws.resync().await.unwrap();

        fake.fail("list_rankings");
        ws.refresh_rankings("j", true).await.unwrap();
        let state = ws.state.read().await;
        assert_eq!(state.rankings("j").len(), 3);
    }

    #[tokio::test]
    async fn test_silent_refresh_failure_without_snapshot_records_empty() {
        let (fake, ws) = workspace(three_candidates());
        fake.fail("list_rankings");
        ws.refresh_rankings("j", true).await.unwrap();
        let state = ws.state.read().await;
        assert_eq!(state.rankings_by_job.get("j").map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_loud_refresh_failure_surfaces_error() {
        let (fake, ws) = workspace(three_candidates());
        fake.fail("list_rankings");
        let err = ws.refresh_rankings("j", false).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert!(!ws.state.read().await.rankings_by_job.contains_key("j"));
    }

    #[tokio::test]
    async fn test_upload_skips_unacceptable_files() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        fake.clear_calls();

        let report = ws
            .upload(
                "j",
                vec![
                    ResumeFile::new("notes.txt", "hello"),
                    ResumeFile::new("huge.pdf", vec![0u8; MAX_UPLOAD_BYTES]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(report.queued, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(
            report.message,
            "No new resumes added (only PDFs under 15MB are accepted)"
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_appends_newcomers_to_manual_order() {
        let (fake, ws) = workspace(three_candidates());
        fake.set_scoring("j", "a", scored(10.0));
        fake.set_scoring("j", "b", scored(20.0));
        fake.set_scoring("j", "c", scored(30.0));
        ws.resync().await.unwrap();
        ws.move_in_list("j", "a", "c").await.unwrap();

        let report = ws
            .upload(
                "j",
                vec![
                    ResumeFile::new("d.pdf", "pdf"),
                    ResumeFile::new("readme.md", "md"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(report.queued, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.message, "1 resume(s) queued for scoring in j requisition");

        let rendered = ws.rendered("j").await;
        assert!(rendered.preferences.manual_override);
        assert_eq!(rendered.ids(), vec!["a", "c", "b", "d"]);
        assert!(ws.subscribe_in_flight().borrow().contains("j"));
    }

    #[tokio::test]
    async fn test_stale_upload_triggers_resync() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        fake.lose_jobs_on_upload();
        fake.clear_calls();

        let err = ws
            .upload("j", vec![ResumeFile::new("d.pdf", "pdf")])
            .await
            .unwrap_err();
        assert!(err.is_stale_state());
        let calls = fake.calls();
        assert!(matches!(calls[0], Call::Upload { files: 1, .. }));
        assert!(calls.contains(&Call::ListJobs));
    }

    #[tokio::test]
    async fn test_delete_removes_candidate_everywhere() {
        let (_fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        ws.move_in_list("j", "c", "a").await.unwrap();

        ws.delete_candidate("j", "a").await.unwrap();

        let rendered = ws.rendered("j").await;
        assert_eq!(rendered.ids(), vec!["c", "b"]);
        assert_eq!(rendered.preferences.manual_order, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_candidate() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        fake.fail("delete_candidate");
        assert!(ws.delete_candidate("j", "a").await.is_err());
        assert_eq!(ws.rendered("j").await.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_rating_never_reaches_backend() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        let err = ws.set_rating("j", "a", 6).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(fake.update_calls().is_empty());

        let updated = ws.set_rating("j", "a", 5).await.unwrap();
        assert_eq!(updated.rating, Some(5));
        assert_eq!(ws.rendered("j").await.entries.iter().find(|e| e.candidate_id == "a").unwrap().rating, Some(5));
    }

    #[tokio::test]
    async fn test_stage_update_must_name_a_job_stage() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();

        let err = ws
            .update_candidate("j", "a", CandidateUpdate::stage("Hired"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err = ws
            .update_candidate("gone", "a", CandidateUpdate::stage("Applied"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(fake.update_calls().is_empty());

        let state = ws.state.read().await;
        assert_eq!(state.candidate("j", "a").unwrap().stage, None);
    }

    #[tokio::test]
    async fn test_forget_job_clears_every_trace() {
        let kv = Arc::new(MemoryStore::new());
        let fake = Arc::new(three_candidates());
        let ws = Workspace::new(fake.clone(), kv.clone(), Duration::from_secs(10));
        ws.resync().await.unwrap();
        assert!(ws.subscribe_in_flight().borrow().contains("j"));

        ws.move_in_list("j", "c", "a").await.unwrap();
        ws.edit_notes("j", "a", "draft".to_string()).await;
        assert!(kv.get("board:j:manual_order").await.unwrap().is_some());

        ws.forget_job("j").await;

        assert!(ws.job("j").await.is_none());
        {
            let state = ws.state.read().await;
            assert!(!state.candidates_by_job.contains_key("j"));
            assert!(!state.rankings_by_job.contains_key("j"));
        }
        assert!(ws.subscribe_in_flight().borrow().is_empty());
        for key in ["board:j:sort_mode", "board:j:manual_override", "board:j:manual_order"] {
            assert_eq!(kv.get(key).await.unwrap(), None, "{key}");
        }
        assert!(ws.notes.peek("j", "a").await.is_none());
    }

    #[tokio::test]
    async fn test_rescore_refreshes_rankings() {
        let (fake, ws) = workspace(three_candidates());
        fake.set_scoring("j", "a", scored(10.0));
        fake.set_scoring("j", "b", scored(20.0));
        fake.set_scoring("j", "c", scored(30.0));
        ws.resync().await.unwrap();
        assert!(ws.subscribe_in_flight().borrow().is_empty());

        let queued = ws.rescore("j", Some("b")).await.unwrap();
        assert_eq!(queued.queued, 1);
        assert!(ws.subscribe_in_flight().borrow().contains("j"));
    }

    #[tokio::test]
    async fn test_sort_change_clears_manual_override() {
        let (fake, ws) = workspace(three_candidates());
        fake.set_scoring("j", "a", scored(10.0));
        fake.set_scoring("j", "b", scored(20.0));
        fake.set_scoring("j", "c", scored(30.0));
        ws.resync().await.unwrap();

        let moved = ws.move_in_list("j", "a", "c").await.unwrap();
        assert_eq!(moved.ids(), vec!["a", "c", "b"]);

        let sorted = ws.set_sort_mode("j", SortMode::Alphabetical).await;
        assert!(!sorted.preferences.manual_override);
        assert_eq!(sorted.ids(), vec!["a", "b", "c"]);

        assert!(ws.move_in_list("j", "b", "b").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let (fake, ws) = workspace(three_candidates());
        ws.resync().await.unwrap();
        fake.delay_responses(Duration::from_secs(60));

        let err = ws.set_rating("j", "a", 3).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Timeout {
                operation: "update candidate",
                after_ms: 10_000
            }
        ));
        let state = ws.state.read().await;
        assert_eq!(state.candidate("j", "a").unwrap().rating, None);
    }
}
