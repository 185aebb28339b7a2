//! Notification surface.
//!
//! Notifications are transient: they are attached to a single response and the
//! client removes them after `ttl_ms`. Nothing here is persisted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// The UI that shows a notification. Each surface has its own display time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Admin,
    Catalog,
}

impl Surface {
    pub fn display_time(&self) -> Duration {
        match self {
            Surface::Admin => Duration::from_secs(5),
            Surface::Catalog => Duration::from_secs(3),
        }
    }
}

/// A timed message. The client must remove it after `ttl_ms` whatever the user does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub ttl_ms: u64,
}

impl Notification {
    pub fn new(
        surface: Surface,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            ttl_ms: surface.display_time().as_millis() as u64,
        }
    }

    pub fn success(surface: Surface, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(surface, NotificationKind::Success, title, message)
    }

    pub fn error(surface: Surface, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(surface, NotificationKind::Error, title, message)
    }

    pub fn warning(surface: Surface, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(surface, NotificationKind::Warning, title, message)
    }

    pub fn info(surface: Surface, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(surface, NotificationKind::Info, title, message)
    }
}

/// Spawn the admin auto-save ticker.
///
/// Each tick only emits an "auto-saved" notification to the log; no data is
/// read or written. The returned counter reports how many ticks have fired.
pub fn spawn_autosave_ticker(period: Duration) -> (JoinHandle<()>, Arc<AtomicU64>) {
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = ticks.clone();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            let notification = Notification::info(
                Surface::Admin,
                "Auto-save",
                "All changes are saved",
            );
            tracing::debug!(tick = n, title = %notification.title, "{}", notification.message);
        }
    });

    (handle, ticks)
}
