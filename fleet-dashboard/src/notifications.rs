//! Bounded in-memory log of recent notifications.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use scan_orchestrator::Notification;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Append, dropping the oldest entry once full
    pub fn push(&self, notification: Notification) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }

    /// Most recent first
    pub fn recent(&self, limit: Option<usize>) -> Vec<Notification> {
        let entries = self.entries.lock();
        entries
            .iter()
            .rev()
            .take(limit.unwrap_or(self.capacity))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drain `rx` into the log until every sender is gone
    pub fn collect(&self, mut rx: mpsc::UnboundedReceiver<Notification>) -> JoinHandle<()> {
        let log = self.clone();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                log.push(notification);
            }
            tracing::debug!("Notification channel closed");
        })
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_orchestrator::Notifier;

    #[test]
    fn test_log_is_bounded_and_newest_first() {
        let log = NotificationLog::new(3);
        for i in 0..5 {
            log.push(Notification::info(format!("n{i}"), ""));
        }

        assert_eq!(log.len(), 3);
        let titles: Vec<String> = log.recent(None).into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["n4", "n3", "n2"]);
        assert_eq!(log.recent(Some(1))[0].title, "n4");
    }

    #[tokio::test]
    async fn test_collect_from_notifier() {
        let log = NotificationLog::default();
        let (notifier, rx) = Notifier::channel();
        let handle = log.collect(rx);

        notifier.notify(Notification::info("Scan complete", "Found 1 online and 0 offline device(s)"));
        drop(notifier);
        handle.await.unwrap();

        assert_eq!(log.recent(None)[0].title, "Scan complete");
    }
}
