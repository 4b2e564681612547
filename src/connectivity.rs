//! Reachability monitor.
//!
//! Periodically opens a TCP connection to a probe address and publishes the
//! result on a `watch` channel. The channel starts at `false` (offline) and
//! only changes when the probe result does.
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    probe: String,
    interval: Duration,
    timeout: Duration,
}

impl NetworkMonitor {
    /// `probe` is a `host:port` pair, e.g. `newsapi.org:443`.
    pub fn new(probe: impl Into<String>, interval: Duration) -> Self {
        Self {
            probe: probe.into(),
            interval,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One probe: can we open a TCP connection within the timeout?
    pub async fn check(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.probe)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(probe = %self.probe, error = %e, "Connectivity probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(probe = %self.probe, "Connectivity probe timed out");
                false
            }
        }
    }

    /// Start probing in the background. The task stops once every receiver
    /// has been dropped.
    pub fn spawn(self) -> (watch::Receiver<bool>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                let online = self.check().await;
                let changed = tx.send_if_modified(|current| {
                    if *current == online {
                        false
                    } else {
                        *current = online;
                        true
                    }
                });
                if changed {
                    if online {
                        tracing::info!(probe = %self.probe, "Network available");
                    } else {
                        tracing::warn!(probe = %self.probe, "Network unavailable");
                    }
                }
            }
            tracing::debug!("Connectivity monitor stopped");
        });
        (rx, handle)
    }
}
