use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::config::RetentionConfig;
use crate::features::files::services::{FileService, SweepReport};

/// Background worker that permanently removes files soft-deleted longer than
/// the retention period. The first sweep runs one interval after start.
pub struct RetentionSweeper {
    file_service: Arc<FileService>,
    interval: Duration,
    retention: chrono::Duration,
}

/// Running sweeper; stop it on shutdown
pub struct SweeperHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RetentionSweeper {
    pub fn new(file_service: Arc<FileService>, config: &RetentionConfig) -> Self {
        Self {
            file_service,
            interval: config.sweep_interval,
            retention: config.retention_period,
        }
    }

    /// Spawn the sweep loop
    pub fn start(self) -> SweeperHandle {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            self.run(token).await;
        });

        SweeperHandle { shutdown, task }
    }

    /// Run the sweep loop until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            "Starting retention sweeper (interval: {:?}, retention: {} days)",
            self.interval,
            self.retention.num_days()
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }

        tracing::info!("Retention sweeper stopped");
    }

    /// One sweep with the threshold computed from now
    pub async fn sweep_once(&self) -> Option<SweepReport> {
        let Some(threshold) = Utc::now().checked_sub_signed(self.retention) else {
            tracing::error!("Retention period {} is out of range", self.retention);
            return None;
        };
        tracing::info!("Running retention sweep for files deleted before {}", threshold);

        match self.file_service.run_retention_sweep(threshold).await {
            Ok(report) => {
                if !report.is_clean() {
                    tracing::warn!(
                        "Retention sweep left {} files for the next run",
                        report.failed.len()
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!("Error during retention sweep: {:?}", e);
                None
            }
        }
    }
}

impl SweeperHandle {
    /// Cancel the loop and wait for an in-flight sweep to finish
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Retention sweeper task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::access::models::Role;
    use crate::shared::test_helpers::TestWorld;

    fn config(interval: Duration) -> RetentionConfig {
        RetentionConfig {
            enabled: true,
            retention_period: chrono::Duration::days(30),
            sweep_interval: interval,
        }
    }

    #[tokio::test]
    async fn test_sweep_once_uses_retention_period() {
        let world = TestWorld::new().await;
        let user = world.add_user(world.org, Role::User);
        let old = world.insert_deleted_file(user, world.org, chrono::Duration::days(31));
        let recent = world.insert_deleted_file(user, world.org, chrono::Duration::days(2));

        let sweeper = RetentionSweeper::new(
            Arc::new(world.file_service()),
            &config(Duration::from_secs(3600)),
        );
        let report = sweeper.sweep_once().await.unwrap();

        assert_eq!(report.purged, 1);
        assert!(world.files.get(old.id).is_none());
        assert!(world.files.get(recent.id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_sweeps_on_interval_and_stops() {
        let world = TestWorld::new().await;
        let user = world.add_user(world.org, Role::User);
        let old = world.insert_deleted_file(user, world.org, chrono::Duration::days(45));

        let handle = RetentionSweeper::new(
            Arc::new(world.file_service()),
            &config(Duration::from_secs(60)),
        )
        .start();

        // Nothing happens before the first interval elapses
        tokio::task::yield_now().await;
        assert!(world.files.get(old.id).is_some());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(world.files.get(old.id).is_none());

        assert!(!handle.is_finished());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_sweep_once_survives_unavailable_storage() {
        let world = TestWorld::new().await;
        let service = world.file_service_on(
            crate::features::files::services::StorageState::Unavailable("down".to_string()),
        );

        let sweeper = RetentionSweeper::new(Arc::new(service), &config(Duration::from_secs(60)));
        assert!(sweeper.sweep_once().await.is_none());
    }
}
