//! Backend health polling and the status indicator.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::{FabricBackend, HealthReport};
use crate::model::SystemStatus;
use crate::view::Mount;

/// Default health poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

const CONNECTED_CLASS: &str = "text-green-600";
const DISCONNECTED_CLASS: &str = "text-red-600";

/// Read-only view of the shared [`SystemStatus`].
#[derive(Debug, Clone)]
pub struct StatusHandle {
    status: Arc<RwLock<SystemStatus>>,
}

impl StatusHandle {
    /// Snapshot of the latest status.
    #[must_use]
    pub fn get(&self) -> SystemStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Polls `GET /api/health` and owns the resulting [`SystemStatus`].
#[derive(Clone)]
pub struct StatusMonitor {
    backend: Arc<dyn FabricBackend>,
    status: Arc<RwLock<SystemStatus>>,
    indicator: Option<Mount>,
    interval: Duration,
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("status", &self.status)
            .field("indicator", &self.indicator.as_ref().map(Mount::id))
            .field("interval", &self.interval)
            .finish()
    }
}

impl StatusMonitor {
    #[must_use]
    pub fn new(backend: Arc<dyn FabricBackend>, indicator: Option<Mount>) -> Self {
        Self {
            backend,
            status: Arc::new(RwLock::new(SystemStatus::default())),
            indicator,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Read-only handle for other components.
    #[must_use]
    pub fn handle(&self) -> StatusHandle {
        StatusHandle {
            status: Arc::clone(&self.status),
        }
    }

    /// Snapshot of the latest status.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        self.handle().get()
    }

    /// Run one health check and refresh the indicator.
    ///
    /// Never fails: transport and decoding errors count as disconnected.
    pub async fn poll(&self) -> SystemStatus {
        let outcome = self.backend.health().await;
        if let Err(err) = &outcome {
            tracing::warn!(name: "status.poll.failed", error = %err, "Health check failed");
        }

        let snapshot = {
            let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
            apply_health(&mut status, outcome.ok().as_ref());
            status.clone()
        };

        tracing::debug!(
            name: "status.polled",
            connected = snapshot.connected,
            message = %snapshot.message,
            "Backend status updated"
        );

        self.render(&snapshot);
        snapshot
    }

    /// Start polling on the configured interval. The first poll runs
    /// immediately.
    pub fn spawn(&self) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.poll().await;
            }
        })
    }

    fn render(&self, status: &SystemStatus) {
        let Some(indicator) = &self.indicator else {
            return;
        };
        indicator.set_text(if status.connected {
            "Connected"
        } else {
            "Disconnected"
        });
        indicator.set_classes(&[if status.connected {
            CONNECTED_CLASS
        } else {
            DISCONNECTED_CLASS
        }]);
    }
}

/// Fold a health report (or its absence) into the status record.
fn apply_health(status: &mut SystemStatus, report: Option<&HealthReport>) {
    status.last_checked = Some(Utc::now());
    match report.map(|r| r.status.as_str()) {
        Some("healthy") => {
            status.connected = true;
            status.message = "Connected".to_string();
        }
        Some("degraded") => {
            status.connected = false;
            status.message = "Degraded".to_string();
        }
        _ => {
            status.connected = false;
            status.message = "Disconnected".to_string();
        }
    }
    if let Some(services) = report.and_then(|r| r.services.clone()) {
        status.services = services;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_apply_healthy() {
        let mut status = SystemStatus::default();
        let mut report = HealthReport::new("healthy");
        report.services = Some(HashMap::from([("registry".to_string(), true)]));

        apply_health(&mut status, Some(&report));

        assert!(status.connected);
        assert_eq!(status.message, "Connected");
        assert!(status.last_checked.is_some());
        assert_eq!(status.services.get("registry"), Some(&true));
        assert_eq!(status.services.len(), 1);
    }

    #[test]
    fn test_apply_degraded_and_unknown() {
        let mut status = SystemStatus::default();
        apply_health(&mut status, Some(&HealthReport::new("degraded")));
        assert!(!status.connected);
        assert_eq!(status.message, "Degraded");

        apply_health(&mut status, Some(&HealthReport::new("unhealthy")));
        assert!(!status.connected);
        assert_eq!(status.message, "Disconnected");

        apply_health(&mut status, None);
        assert!(!status.connected);
        // Services from the last successful report are kept.
        assert_eq!(status.services.len(), 3);
    }
}
