use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::manager::TimelineManager;

/// Periodically prunes timelines nobody has read for a full sweep interval.
#[derive(Clone)]
pub struct TimelineSweeper {
    manager: Arc<TimelineManager>,
}

impl TimelineSweeper {
    pub fn new(manager: Arc<TimelineManager>) -> Self {
        Self { manager }
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    /// Prune every timeline idle as of `now`. Returns the total affected count.
    #[instrument(skip_all)]
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let started = Instant::now();
        let config = *self.manager.config();

        let mut swept = 0usize;
        let mut pruned = 0usize;
        for timeline in self.manager.snapshot() {
            let Some(count) = timeline
                .prune_if_idle(
                    now,
                    config.sweep_interval,
                    config.prepared_len,
                    config.indexed_len,
                )
                .await
            else {
                continue;
            };
            swept += 1;
            pruned += count;
            if count > 0 {
                debug!(account_id = timeline.account_id(), count, "pruned idle timeline");
            }
        }

        counter!("feedline_timeline_pruned_total").increment(pruned as u64);
        histogram!("feedline_timeline_sweep_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        info!(swept, pruned, "timeline sweep finished");
        pruned
    }

    /// Sweep on every interval tick until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.manager.config().sweep_interval);
        interval.tick().await; // Skip the first immediate tick
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("timeline sweeper stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
