//! Persistent push-stream transport.
//!
//! The consumer only sees [`StreamConnector`] and [`FrameStream`]; the
//! websocket implementation lives in [`websocket`], and tests swap in a
//! scripted stream.

/// Reconnecting reader that decodes frames and dispatches events in order.
pub mod consumer;
/// `tokio-tungstenite` transport.
pub mod websocket;

use crate::BoxFuture;

pub use consumer::{Backoff, ConsumerSettings, EventConsumer};
pub use websocket::WebSocketConnector;

/// One unit read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text payload to decode.
    Text(String),
    /// Keep-alive traffic (ping/pong, binary). Only proves the link is alive.
    Control,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("invalid stream endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no traffic for {0:?}")]
    Timeout(std::time::Duration),

    #[error("stream closed")]
    Closed,
}

impl StreamError {
    /// Errors that no amount of reconnecting will fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::InvalidEndpoint(_))
    }
}

/// An open stream connection.
pub trait FrameStream: Send {
    /// Wait for the next frame. `Ok(None)` means the peer closed cleanly.
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>, StreamError>>;

    /// Send a keep-alive ping.
    fn ping(&mut self) -> BoxFuture<'_, Result<(), StreamError>>;
}

/// Opens new [`FrameStream`]s; called again after every connection loss.
pub trait StreamConnector: Send + Sync {
    fn endpoint(&self) -> &str;

    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameStream>, StreamError>>;
}
