//! Background task lifecycle: periodic persistence, trigger rescans and
//! subscriber heartbeats.
//!
//! All three tasks start at engine bring-up and are cancelled at teardown;
//! each swallows and logs its own errors so a failing tick never terminates
//! the engine. Shutdown performs one final state save.

use crate::engine::core::MatchingEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Handles to the engine's background tasks.
///
/// Dropping this without calling [`EngineTasks::shutdown`] leaves the tasks
/// running until their runtime stops.
pub struct EngineTasks {
    persist: JoinHandle<()>,
    triggers: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl EngineTasks {
    /// Cancel all background tasks and write a final state snapshot.
    pub async fn shutdown(self, engine: &MatchingEngine) {
        self.persist.abort();
        self.triggers.abort();
        self.heartbeat.abort();
        if let Err(error) = engine.save_state().await {
            warn!(%error, "final state save failed");
        }
        info!("background tasks stopped");
    }
}

impl MatchingEngine {
    /// Spawn the persistence, trigger-rescan and heartbeat tasks.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same engine (the rescan
    /// queue receiver has already been taken).
    pub fn start_background_tasks(self: Arc<Self>) -> EngineTasks {
        let mut rescan_rx = self
            .rescan_rx
            .lock()
            .take()
            .expect("background tasks already started");

        let persist = {
            let engine = Arc::clone(&self);
            let interval = engine.config().save_interval;
            tokio::spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(error) = engine.save_state().await {
                        warn!(%error, "periodic state save failed");
                    }
                }
            })
        };

        let triggers = {
            let engine = Arc::clone(&self);
            let interval = engine.config().trigger_interval;
            tokio::spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            for symbol in engine.symbols() {
                                engine.process_triggers(&symbol).await;
                            }
                        }
                        Some(symbol) = rescan_rx.recv() => {
                            engine.process_triggers(&symbol).await;
                        }
                    }
                }
            })
        };

        let heartbeat = {
            let engine = Arc::clone(&self);
            let interval = engine.config().heartbeat_interval;
            tokio::spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    engine.fanout().broadcast_heartbeat();
                }
            })
        };

        info!("background tasks started");
        EngineTasks {
            persist,
            triggers,
            heartbeat,
        }
    }
}
