use crate::store::{ExpiryPolicy, SessionStore};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    pub interval: Duration,
    pub ttl: Duration,
    pub policy: ExpiryPolicy,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            ttl: Duration::from_secs(60 * 60),
            policy: ExpiryPolicy::default(),
        }
    }
}

/// Periodically evicts expired sessions from the store.
pub struct Reaper {
    store: Arc<dyn SessionStore>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(store: Arc<dyn SessionStore>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// Runs one sweep and returns the ids it removed.
    pub fn sweep_once(&self) -> Vec<String> {
        let removed = self.store.sweep(self.config.ttl, self.config.policy);
        for id in &removed {
            info!("Cleaned up old session: {}", id);
        }
        removed
    }

    /// Sweeps on every tick until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        // The first tick fires immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_once();
                    debug!("Reaper sweep removed {} sessions, {} remain", removed.len(), self.store.len());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Session reaper stopped");
    }
}
