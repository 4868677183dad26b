//! User-visible alerts.

use std::sync::Mutex;

/// Sink for blocking, user-visible failure alerts.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Logs alerts and keeps them until someone drains them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every pending alert, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.alerts
            .lock()
            .map(|mut a| std::mem::take(&mut *a))
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        tracing::warn!(target: "bookmark_sync::alert", "{}", message);
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(message.to_string());
        }
    }
}
