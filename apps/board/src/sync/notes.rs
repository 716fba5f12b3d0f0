//! Notes drafts: keystrokes land here and reach the backend only on commit
//! (blur), and only when the text actually changed.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::models::{Candidate, CandidateUpdate};
use crate::ranking_client::ClientError;
use crate::sync::workspace::Workspace;

#[derive(Debug, Default)]
pub struct NotesBuffer {
    drafts: Mutex<HashMap<(String, String), String>>,
}

impl NotesBuffer {
    pub async fn stage(&self, job_id: &str, candidate_id: &str, text: String) {
        self.drafts
            .lock()
            .await
            .insert((job_id.to_string(), candidate_id.to_string()), text);
    }

    pub async fn peek(&self, job_id: &str, candidate_id: &str) -> Option<String> {
        self.drafts
            .lock()
            .await
            .get(&(job_id.to_string(), candidate_id.to_string()))
            .cloned()
    }

    pub async fn discard(&self, job_id: &str, candidate_id: &str) {
        self.drafts
            .lock()
            .await
            .remove(&(job_id.to_string(), candidate_id.to_string()));
    }

    /// Drops the draft only if it still holds `committed`; newer keystrokes survive.
    async fn settle(&self, job_id: &str, candidate_id: &str, committed: &str) {
        let mut drafts = self.drafts.lock().await;
        let key = (job_id.to_string(), candidate_id.to_string());
        if drafts.get(&key).map(String::as_str) == Some(committed) {
            drafts.remove(&key);
        }
    }

    pub async fn discard_job(&self, job_id: &str) {
        self.drafts.lock().await.retain(|(job, _), _| job != job_id);
    }
}

impl Workspace {
    pub async fn edit_notes(&self, job_id: &str, candidate_id: &str, text: String) {
        self.notes.stage(job_id, candidate_id, text).await;
    }

    /// Text shown in the notes field: the draft when there is one.
    pub async fn notes_text(&self, job_id: &str, candidate_id: &str) -> String {
        if let Some(draft) = self.notes.peek(job_id, candidate_id).await {
            return draft;
        }
        self.state
            .read()
            .await
            .candidate(job_id, candidate_id)
            .and_then(|c| c.notes.clone())
            .unwrap_or_default()
    }

    /// Flushes the draft. Returns the canonical candidate when an update was
    /// sent, `None` when there was nothing to send. A failed update keeps the
    /// draft so the next commit retries it.
    pub async fn commit_notes(
        &self,
        job_id: &str,
        candidate_id: &str,
    ) -> Result<Option<Candidate>, ClientError> {
        let Some(draft) = self.notes.peek(job_id, candidate_id).await else {
            return Ok(None);
        };
        let canonical = self
            .state
            .read()
            .await
            .candidate(job_id, candidate_id)
            .and_then(|c| c.notes.clone())
            .unwrap_or_default();
        if draft == canonical {
            debug!("Notes for {candidate_id} unchanged, nothing to send");
            self.notes.discard(job_id, candidate_id).await;
            return Ok(None);
        }

        let updated = self
            .update_candidate(job_id, candidate_id, CandidateUpdate::notes(draft.clone()))
            .await?;
        self.notes.settle(job_id, candidate_id, &draft).await;
        Ok(Some(updated))
    }
}
