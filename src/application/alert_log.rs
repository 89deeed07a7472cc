// Alerting collaborator - keeps the most recent alerts for display
use crate::domain::alert::{Alert, AlertKind};
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub struct AlertLog {
    capacity: usize,
    entries: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn push(&self, kind: AlertKind, message: impl Into<String>) {
        let alert = Alert::new(kind, message);
        match kind {
            AlertKind::Error => tracing::error!(message = %alert.message, "alert raised"),
            AlertKind::Warning => tracing::warn!(message = %alert.message, "alert raised"),
            AlertKind::Info => tracing::info!(message = %alert.message, "alert raised"),
        }

        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().await;
        entries.push_front(alert);
        entries.truncate(self.capacity);
    }

    /// Newest first.
    pub async fn recent(&self) -> Vec<Alert> {
        self.entries.lock().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keeps_newest_up_to_capacity() {
        let log = AlertLog::new(2);
        log.push(AlertKind::Info, "first").await;
        log.push(AlertKind::Warning, "second").await;
        log.push(AlertKind::Error, "third").await;

        let recent = log.recent().await;
        let messages: Vec<&str> = recent.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["third", "second"]);
        assert_eq!(recent[0].kind, AlertKind::Error);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_nothing() {
        let log = AlertLog::new(0);
        log.push(AlertKind::Error, "dropped").await;
        assert!(log.recent().await.is_empty());
    }
}
