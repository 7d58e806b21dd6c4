#![deny(unsafe_code)]

//! Chat channel adapters for ctbot.
//!
//! A transport hands every line it reads to a [`ChatServiceHandle`]. The
//! [`ChatService`] drops lines that are not commands, applies the per-author
//! rate limit, and publishes what remains to the daemon's message bus as
//! [`ctbot_core::Envelope`]s. Replies leave through the daemon's
//! notification sink, not through this crate.

pub mod console;
pub mod message;
pub mod rate_limit;
pub mod service;

pub use console::pump_lines;
pub use message::ChatMessage;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{ChatService, ChatServiceHandle, Inbound};

/// Errors from the chat adapter.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat service channel closed")]
    Closed,

    #[error("author {author} exceeded the command rate limit")]
    RateLimited { author: String },

    #[error("no daemon is listening on the message bus")]
    BusClosed,

    #[error("transport read failed: {0}")]
    Io(#[from] std::io::Error),
}
