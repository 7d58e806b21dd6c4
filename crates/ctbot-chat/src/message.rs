//! Inbound chat lines as seen by a transport.

use chrono::{DateTime, Utc};

use ctbot_core::Envelope;

/// One line of chat read by a transport.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Display name of the sender.
    pub author: String,

    /// Channel or room the line arrived on.
    pub channel: String,

    /// Raw text, untrimmed.
    pub body: String,

    /// When the transport received the line.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(channel: &str, author: &str, body: &str) -> Self {
        Self {
            author: author.to_string(),
            channel: channel.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Whether the body could be addressed to the bot at all.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.body.starts_with(prefix)
    }

    /// Convert into a bus envelope, keeping the receive time.
    pub fn into_envelope(self) -> Envelope {
        let mut envelope = Envelope::new(&self.channel, &self.author, &self.body);
        envelope.timestamp = self.timestamp;
        envelope
    }
}
