//! Per-job board preferences: sort mode, manual-override flag and the
//! user-chosen candidate order.
//!
//! The manual order is a view over the live candidate set, never the source of
//! membership. Stored ids that disappeared are dropped and newcomers are
//! appended, so the list always names every live candidate exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ordering::sort_mode::SortMode;
use crate::persistence::KvStore;

/// Everything persisted for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardPreferences {
    pub sort_mode: SortMode,
    pub manual_override: bool,
    pub manual_order: Vec<String>,
}

/// Keeps `prev`'s relative order for ids still live (first occurrence wins),
/// then appends the remaining live ids in the order given.
pub fn reconcile_order(prev: &[String], live_ids: &[String]) -> Vec<String> {
    let live: HashSet<&str> = live_ids.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(live_ids.len());
    let mut order = Vec::with_capacity(live_ids.len());

    for id in prev {
        if live.contains(id.as_str()) && seen.insert(id.as_str()) {
            order.push(id.clone());
        }
    }
    for id in live_ids {
        if seen.insert(id.as_str()) {
            order.push(id.clone());
        }
    }
    order
}

/// Moves `dragged_id` to sit immediately before `target_id`, or to the end when
/// the target is not in `order`. Returns `None` for a drop onto itself or a
/// dragged id that is not in `order`.
pub fn move_before(order: &[String], dragged_id: &str, target_id: &str) -> Option<Vec<String>> {
    if dragged_id == target_id || !order.iter().any(|id| id == dragged_id) {
        return None;
    }
    let mut next: Vec<String> = order
        .iter()
        .filter(|id| id.as_str() != dragged_id)
        .cloned()
        .collect();
    match next.iter().position(|id| id == target_id) {
        Some(index) => next.insert(index, dragged_id.to_string()),
        None => next.push(dragged_id.to_string()),
    }
    Some(next)
}

fn sort_mode_key(job_id: &str) -> String {
    format!("board:{job_id}:sort_mode")
}

fn manual_override_key(job_id: &str) -> String {
    format!("board:{job_id}:manual_override")
}

fn manual_order_key(job_id: &str) -> String {
    format!("board:{job_id}:manual_order")
}

/// Decodes a stored order. Anything other than a JSON array yields an empty
/// list; non-string members are skipped.
fn decode_order(raw: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
    )
}

/// Persisted, per-job manual order and sort preferences.
///
/// Reads fall back to defaults (`overall`, no override, empty order) on missing
/// or corrupt values and writes that fail are logged, never propagated: losing
/// a preference must not break the board.
pub struct ManualOrderStore {
    store: Arc<dyn KvStore>,
    cache: Mutex<HashMap<String, BoardPreferences>>,
}

impl ManualOrderStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn preferences(&self, job_id: &str) -> BoardPreferences {
        self.ensure_loaded(job_id).await;
        self.update(job_id, |prefs| prefs.clone()).await
    }

    /// Reconciles the stored order against the live ids (pass them in automatic
    /// sort order so newcomers land in that order) and persists the result when
    /// it changed.
    pub async fn reconcile(&self, job_id: &str, live_ids: &[String]) -> Vec<String> {
        self.ensure_loaded(job_id).await;
        let (order, changed) = self
            .update(job_id, |prefs| {
                let order = reconcile_order(&prefs.manual_order, live_ids);
                let changed = order != prefs.manual_order;
                prefs.manual_order = order.clone();
                (order, changed)
            })
            .await;
        if changed {
            self.write_order(job_id, &order).await;
        }
        order
    }

    /// Applies a drag within the rendered list. The result becomes the stored
    /// order and switches the job to manual ordering. A no-op drag changes
    /// nothing and returns `None`.
    pub async fn apply_move(
        &self,
        job_id: &str,
        dragged_id: &str,
        target_id: &str,
        rendered_order: &[String],
    ) -> Option<Vec<String>> {
        let next = move_before(rendered_order, dragged_id, target_id)?;

        self.ensure_loaded(job_id).await;
        self.update(job_id, |prefs| {
            prefs.manual_order = next.clone();
            prefs.manual_override = true;
        })
        .await;
        self.write_order(job_id, &next).await;
        self.write(&manual_override_key(job_id), "1").await;
        debug!("Manual order for job {job_id}: moved {dragged_id} before {target_id}");
        Some(next)
    }

    /// Picking a sort mode always returns the job to automatic ordering.
    pub async fn set_sort_mode(&self, job_id: &str, mode: SortMode) -> BoardPreferences {
        self.ensure_loaded(job_id).await;
        let snapshot = self
            .update(job_id, |prefs| {
                prefs.sort_mode = mode;
                prefs.manual_override = false;
                prefs.clone()
            })
            .await;
        self.write(&sort_mode_key(job_id), mode.as_str()).await;
        self.write(&manual_override_key(job_id), "0").await;
        snapshot
    }

    /// "Use sort order": drops the manual override, keeps the stored order.
    pub async fn revert_to_sort_order(&self, job_id: &str) -> BoardPreferences {
        self.ensure_loaded(job_id).await;
        let snapshot = self
            .update(job_id, |prefs| {
                prefs.manual_override = false;
                prefs.clone()
            })
            .await;
        self.write(&manual_override_key(job_id), "0").await;
        snapshot
    }

    /// Removes every persisted fact about a deleted job.
    pub async fn forget(&self, job_id: &str) {
        self.cache.lock().await.remove(job_id);
        for key in [
            sort_mode_key(job_id),
            manual_override_key(job_id),
            manual_order_key(job_id),
        ] {
            if let Err(e) = self.store.delete(&key).await {
                warn!("Failed to delete {key}: {e}");
            }
        }
    }

    /// Fills the cache entry from the store on first use. The cache lock is
    /// not held while the store is read; a concurrent load of the same job
    /// keeps whichever entry landed first.
    async fn ensure_loaded(&self, job_id: &str) {
        if self.cache.lock().await.contains_key(job_id) {
            return;
        }
        let loaded = self.load(job_id).await;
        self.cache
            .lock()
            .await
            .entry(job_id.to_string())
            .or_insert(loaded);
    }

    /// Runs `f` on the cached entry under the lock. Store I/O happens outside.
    async fn update<R>(&self, job_id: &str, f: impl FnOnce(&mut BoardPreferences) -> R) -> R {
        let mut cache = self.cache.lock().await;
        f(cache.entry(job_id.to_string()).or_default())
    }

    async fn load(&self, job_id: &str) -> BoardPreferences {
        let sort_mode = self
            .read(&sort_mode_key(job_id))
            .await
            .and_then(|raw| SortMode::from_persisted(&raw))
            .unwrap_or_default();
        let manual_override = self
            .read(&manual_override_key(job_id))
            .await
            .map(|raw| raw == "1")
            .unwrap_or(false);
        let manual_order = match self.read(&manual_order_key(job_id)).await {
            Some(raw) => decode_order(&raw).unwrap_or_else(|| {
                warn!("Discarding malformed manual order for job {job_id}");
                Vec::new()
            }),
            None => Vec::new(),
        };

        BoardPreferences {
            sort_mode,
            manual_override,
            manual_order,
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {key}, using default: {e}");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            warn!("Failed to persist {key}: {e}");
        }
    }

    async fn write_order(&self, job_id: &str, order: &[String]) {
        match serde_json::to_string(order) {
            Ok(raw) => self.write(&manual_order_key(job_id), &raw).await,
            Err(e) => warn!("Failed to encode manual order for job {job_id}: {e}"),
        }
    }
}
