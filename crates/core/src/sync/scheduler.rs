//! Recurring sync cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::config::SyncConfig;
use super::engine::FeedSyncEngine;

/// Runs [`FeedSyncEngine::run_cycle`] on a timer until stopped.
pub struct SyncScheduler {
    engine: Arc<FeedSyncEngine>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<FeedSyncEngine>, config: &SyncConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            engine,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the sync loop. The first cycle runs immediately.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Sync scheduler already running");
            return;
        }

        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Sync loop started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sync loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        // Errors are logged and counted by the engine.
                        let _ = engine.run_cycle().await;
                    }
                }
            }
            info!("Sync loop stopped");
        });
    }

    /// Stop the loop. A cycle already in progress runs to completion.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Sync scheduler not running");
            return;
        }

        info!("Stopping sync scheduler");
        let _ = self.shutdown_tx.send(());
    }
}
