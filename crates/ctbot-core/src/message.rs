//! Message types for the ctbot chat bus.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A chat line routed through the daemon's message bus.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Unique message identifier.
    pub id: u64,

    /// When the line was received.
    pub timestamp: DateTime<Utc>,

    /// Source channel (e.g. "console", "ipc").
    pub channel: String,

    /// Display name of whoever sent the line. Shown in reply footers.
    pub author: String,

    /// The raw chat line.
    pub body: String,
}

impl Envelope {
    pub fn new(channel: &str, author: &str, body: &str) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            channel: channel.to_string(),
            author: author.to_string(),
            body: body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_creation() {
        let envelope = Envelope::new("console", "alice", "!help");
        assert_eq!(envelope.channel, "console");
        assert_eq!(envelope.author, "alice");
        assert_eq!(envelope.body, "!help");
        assert!(envelope.id > 0);
    }

    #[test]
    fn test_unique_ids() {
        let a = Envelope::new("a", "x", "1");
        let b = Envelope::new("b", "y", "2");
        assert_ne!(a.id, b.id);
    }
}
