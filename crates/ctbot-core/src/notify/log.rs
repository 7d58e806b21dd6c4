//! Sink that writes every notification to the `tracing` log.

use tracing::info;

use crate::BoxFuture;

use super::{Notification, NotificationSink, NotifyError};

/// Logs notifications instead of delivering them. The default sink.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            info!(
                title = %notification.title,
                url = notification.url.as_deref().unwrap_or(""),
                fields = notification.fields.len(),
                footer = notification.footer.as_deref().unwrap_or(""),
                "Notification"
            );
            if !notification.content.is_empty() {
                info!(content = %notification.content, "Notification content");
            }
            Ok(())
        })
    }
}
