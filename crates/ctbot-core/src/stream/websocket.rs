//! WebSocket transport for the event stream.
//!
//! Text frames are passed up as-is. Every other non-close message surfaces
//! as [`Frame::Control`] so it still counts as link activity.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::BoxFuture;

use super::{Frame, FrameStream, StreamConnector, StreamError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a `ws://` or `wss://` event endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl StreamConnector for WebSocketConnector {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameStream>, StreamError>> {
        Box::pin(async move {
            debug!(url = %self.url, "Opening websocket");
            let (socket, response) = connect_async(self.url.as_str())
                .await
                .map_err(connect_error)?;
            debug!(status = %response.status(), "Websocket handshake complete");
            Ok(Box::new(WebSocketStreamAdapter { socket }) as Box<dyn FrameStream>)
        })
    }
}

fn connect_error(e: tungstenite::Error) -> StreamError {
    match e {
        tungstenite::Error::Url(e) => StreamError::InvalidEndpoint(e.to_string()),
        other => StreamError::Connect(other.to_string()),
    }
}

struct WebSocketStreamAdapter {
    socket: Socket,
}

impl FrameStream for WebSocketStreamAdapter {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>, StreamError>> {
        Box::pin(async move {
            match self.socket.next().await {
                None | Some(Ok(Message::Close(_))) => Ok(None),
                Some(Ok(Message::Text(text))) => Ok(Some(Frame::Text(text.to_string()))),
                Some(Ok(_)) => Ok(Some(Frame::Control)),
                Some(Err(e)) => Err(StreamError::Transport(e.to_string())),
            }
        })
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), StreamError>> {
        Box::pin(async move {
            self.socket
                .send(Message::Ping(Default::default()))
                .await
                .map_err(|e| StreamError::Transport(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_url_is_fatal() {
        let connector = WebSocketConnector::new("http://not-a-websocket.invalid/events");
        let err = match connector.connect().await {
            Ok(_) => panic!("connect should fail"),
            Err(e) => e,
        };
        assert!(err.is_fatal(), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WebSocketConnector::new(format!("ws://{addr}/api/events"));
        let err = match connector.connect().await {
            Ok(_) => panic!("connect should fail"),
            Err(e) => e,
        };
        assert!(!err.is_fatal());
    }
}
