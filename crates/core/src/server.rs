//! Screening server lifecycle
//!
//! Thin wrapper around [`ScreeningEngine`] that owns the background
//! maintenance work: the periodic eviction sweep that removes terminal
//! call records past the retention window. Front doors (HTTP, signaling
//! webhooks) hold the engine through this server.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::orchestrator::ScreeningEngine;

/// Engine plus its background maintenance tasks
pub struct ScreeningServer {
    engine: Arc<ScreeningEngine>,

    /// Handle to the eviction sweep task
    evictor_handle: Option<JoinHandle<()>>,
}

impl ScreeningServer {
    /// Wrap an engine; background tasks start on [`start`](Self::start)
    pub fn new(engine: Arc<ScreeningEngine>) -> Self {
        Self {
            engine,
            evictor_handle: None,
        }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Arc<ScreeningEngine> {
        &self.engine
    }

    /// Start background maintenance. Idempotent.
    pub fn start(&mut self) {
        if self.evictor_handle.is_some() {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let interval = engine.config().general.eviction_interval;
        let retention = engine.config().general.retention_window;

        self.evictor_handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh server
            // does not sweep an empty registry.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = engine.registry().evict_expired(Utc::now(), retention);
                if evicted > 0 {
                    debug!("🧹 Evicted {} finished call records", evicted);
                }
            }
        }));

        info!("🚀 Screening server started (eviction every {:?})", interval);
    }

    /// Stop background maintenance
    pub fn stop(&mut self) {
        if let Some(handle) = self.evictor_handle.take() {
            handle.abort();
            info!("🛑 Screening server stopped");
        }
    }
}

impl Drop for ScreeningServer {
    fn drop(&mut self) {
        self.stop();
    }
}
