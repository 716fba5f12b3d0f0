//! Background refresh of rankings while scoring is in flight.
//!
//! The poller sleeps while no job has pending or processing records. As soon
//! as the in-flight set is non-empty it arms an interval timer and refreshes
//! every in-flight job silently on each tick. Any change to the set (scoring
//! finished, new uploads, a deleted job) re-arms the timer against the new set.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::sync::workspace::Workspace;

pub struct ScoringPoller {
    workspace: Arc<Workspace>,
    interval: Duration,
}

/// Owner of a running poller. Dropping it also stops the task.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl ScoringPoller {
    pub fn new(workspace: Arc<Workspace>, interval: Duration) -> Self {
        Self {
            workspace,
            interval,
        }
    }

    pub fn spawn(self) -> PollerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut in_flight = self.workspace.subscribe_in_flight();
        info!("Scoring poller started ({}ms interval)", self.interval.as_millis());

        loop {
            let jobs: BTreeSet<String> = in_flight.borrow_and_update().clone();

            if jobs.is_empty() {
                tokio::select! {
                    changed = in_flight.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = shutdown.changed() => break,
                }
            }

            debug!("Polling rankings for {} job(s)", jobs.len());
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once(&jobs).await;
                        if in_flight.has_changed().unwrap_or(true) {
                            break;
                        }
                    }
                    changed = in_flight.changed() => {
                        if changed.is_err() {
                            info!("Scoring poller stopped");
                            return;
                        }
                        break;
                    }
                    _ = shutdown.changed() => {
                        info!("Scoring poller stopped");
                        return;
                    }
                }
            }
        }
        info!("Scoring poller stopped");
    }

    async fn poll_once(&self, jobs: &BTreeSet<String>) {
        join_all(
            jobs.iter()
                .map(|job_id| self.workspace.refresh_rankings(job_id, true)),
        )
        .await;
    }
}
