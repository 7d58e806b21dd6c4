//! A notification sink that records what it is sent.

use std::sync::Mutex;
use std::time::Duration;

use ctbot_core::BoxFuture;
use ctbot_core::notify::{Notification, NotificationSink, NotifyError};

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records every notification and then reports failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sink lock").clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.title).collect()
    }

    /// Wait until at least `count` notifications arrived. Panics on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("expected {count} notifications, got {}: {:?}", sent.len(), sent);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        self.sent.lock().expect("sink lock").push(notification.clone());
        let fail = self.fail;
        Box::pin(async move { if fail { Err(NotifyError::Closed) } else { Ok(()) } })
    }
}
