//! A scripted event stream for consumer and daemon tests.
//!
//! Each call to `connect` takes the next scripted session. Once the script
//! runs out, connections succeed but stay silent until shutdown.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ctbot_core::BoxFuture;
use ctbot_core::stream::{Frame, FrameStream, StreamConnector, StreamError};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Text(String),
    Control,
    /// Wait before the next step.
    Pause(Duration),
    /// Fail the connection with a transport error.
    Fail(String),
    /// Close cleanly.
    Close,
    /// Stay open without sending anything.
    Hold,
}

enum Connect {
    Session(Vec<ScriptStep>),
    Refuse(String),
}

#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Connect>>,
    connects: AtomicUsize,
    pings: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection that plays `steps` and then closes.
    pub fn session(self, steps: Vec<ScriptStep>) -> Self {
        self.push(Connect::Session(steps))
    }

    /// Append a failed connection attempt.
    pub fn refuse(self, reason: &str) -> Self {
        self.push(Connect::Refuse(reason.to_string()))
    }

    fn push(self, entry: Connect) -> Self {
        self.script.lock().expect("script lock").push_back(entry);
        self
    }

    /// Connection attempts so far, including refused ones.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl StreamConnector for ScriptedConnector {
    fn endpoint(&self) -> &str {
        "scripted://events"
    }

    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameStream>, StreamError>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().expect("script lock").pop_front();
        let pings = self.pings.clone();
        Box::pin(async move {
            let steps = match next {
                Some(Connect::Session(steps)) => steps,
                Some(Connect::Refuse(reason)) => return Err(StreamError::Connect(reason)),
                None => vec![ScriptStep::Hold],
            };
            Ok(Box::new(ScriptedStream {
                steps: steps.into(),
                pings,
            }) as Box<dyn FrameStream>)
        })
    }
}

struct ScriptedStream {
    steps: VecDeque<ScriptStep>,
    pings: Arc<AtomicUsize>,
}

impl FrameStream for ScriptedStream {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>, StreamError>> {
        Box::pin(async move {
            loop {
                match self.steps.pop_front() {
                    Some(ScriptStep::Text(text)) => return Ok(Some(Frame::Text(text))),
                    Some(ScriptStep::Control) => return Ok(Some(Frame::Control)),
                    Some(ScriptStep::Pause(delay)) => tokio::time::sleep(delay).await,
                    Some(ScriptStep::Fail(reason)) => return Err(StreamError::Transport(reason)),
                    Some(ScriptStep::Close) | None => return Ok(None),
                    Some(ScriptStep::Hold) => {
                        self.steps.push_front(ScriptStep::Hold);
                        std::future::pending::<()>().await;
                    }
                }
            }
        })
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), StreamError>> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
