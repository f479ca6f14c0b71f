// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Reaper
//!
//! Background task that periodically drops expired records from the
//! [`MemorySessionStore`]. Expired sessions are already invisible to
//! `load`; the reaper only bounds memory use.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, the
//! same token that stops the HTTP server.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::MemorySessionStore;

/// Default interval between sweeps.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(300);

pub struct SessionReaper {
    store: MemorySessionStore,
    interval: Duration,
}

impl SessionReaper {
    pub fn new(store: MemorySessionStore) -> Self {
        Self {
            store,
            interval: DEFAULT_PURGE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reaper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Session reaper starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session reaper shutting down");
                    return;
                }
            }

            self.sweep().await;
        }
    }

    /// Remove expired sessions once, returning how many were dropped.
    pub async fn sweep(&self) -> usize {
        let purged = self.store.purge_expired().await;
        if purged > 0 {
            let remaining = self.store.len().await;
            debug!(purged, remaining, "Session reaper: purged expired sessions");
        }
        purged
    }
}
