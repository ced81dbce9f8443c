use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use crate::core::engine::SearchEngine;

/// Running background maintenance; dropping it leaves the task running
/// until the runtime shuts down
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stops the task after a final save of pending changes
    pub async fn shutdown(self) {
        // Err only when the task already exited
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            error!(error = %err, "maintenance task ended abnormally");
        }
    }
}

/// Spawns the periodic snapshot save and optimize rebuild onto the
/// current tokio runtime
pub fn spawn(engine: Arc<SearchEngine>) -> MaintenanceHandle {
    let config = engine.config().maintenance.clone();
    let (shutdown, mut stop) = watch::channel(false);

    let task = tokio::spawn(async move {
        let save_every = Duration::from_secs(config.save_interval_secs);
        let optimize_every = Duration::from_secs(config.optimize_interval_secs);
        let mut save_ticker = interval_at(Instant::now() + save_every, save_every);
        let mut optimize_ticker = interval_at(Instant::now() + optimize_every, optimize_every);
        save_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        optimize_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            save_interval_secs = config.save_interval_secs,
            optimize_interval_secs = config.optimize_interval_secs,
            "maintenance started"
        );

        loop {
            tokio::select! {
                _ = save_ticker.tick() => save(&engine).await,
                _ = optimize_ticker.tick() => optimize(&engine).await,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        save(&engine).await;
        info!("maintenance stopped");
    });

    MaintenanceHandle { shutdown, task }
}

async fn save(engine: &Arc<SearchEngine>) {
    let engine = Arc::clone(engine);
    match tokio::task::spawn_blocking(move || engine.save_if_dirty()).await {
        Ok(Ok(true)) => debug!("periodic snapshot saved"),
        Ok(Ok(false)) => {}
        Ok(Err(err)) => warn!(error = %err, "periodic snapshot failed, retrying next tick"),
        Err(err) => error!(error = %err, "snapshot task panicked"),
    }
}

async fn optimize(engine: &Arc<SearchEngine>) {
    let engine = Arc::clone(engine);
    match tokio::task::spawn_blocking(move || engine.rebuild()).await {
        Ok(report) => debug!(indexed = report.indexed, "optimize rebuild finished"),
        Err(err) => error!(error = %err, "optimize rebuild panicked"),
    }
}
