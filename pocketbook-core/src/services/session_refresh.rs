//! Background refresh of the identity session

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ports::IdentityProvider;

use super::logging::{LogEvent, LoggingService};

/// Periodically calls `IdentityProvider::refresh_session`
///
/// Runs as a tokio task from `start` until `stop` (or drop). Refresh
/// failures are logged and the next tick tries again.
pub struct SessionRefresher {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SessionRefresher {
    pub fn start(
        identity: Arc<dyn IdentityProvider>,
        every: Duration,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the session is fresh at start
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = identity.refresh_session().await {
                            if let Some(logger) = &logger {
                                let _ = logger.log(
                                    LogEvent::new("session_refresh_failed").with_error(e.to_string()),
                                );
                            }
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the task and wait for it to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for SessionRefresher {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::StaticIdentity;

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_on_every_tick_until_stopped() {
        let identity = Arc::new(StaticIdentity::signed_in("user-1"));
        let refresher =
            SessionRefresher::start(identity.clone(), Duration::from_secs(60), None);
        assert!(refresher.is_running());

        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(identity.refresh_count(), 3);

        refresher.stop().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(identity.refresh_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_the_task() {
        let identity = Arc::new(StaticIdentity::signed_in("user-1"));
        {
            let _refresher =
                SessionRefresher::start(identity.clone(), Duration::from_secs(10), None);
            tokio::time::sleep(Duration::from_secs(15)).await;
        }
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(identity.refresh_count(), 1);
    }
}
