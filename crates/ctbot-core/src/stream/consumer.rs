//! The long-lived stream consumer.
//!
//! A reader task owns the connection: it pings, watches for idle links,
//! decodes frames, and reconnects with exponential backoff. Decoded events
//! go through an mpsc channel to a single dispatcher task, so events are
//! handled one at a time in arrival order while the reader keeps draining
//! the socket. Frames that arrive while disconnected are lost.
//!
//! When the dispatch queue is full the reader parks the next event and stops
//! reading until the dispatcher frees a slot. Pings and shutdown are still
//! served while parked.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Permit;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use ctbot_config::StreamConfig;

use crate::daemon::ShutdownSignal;
use crate::dispatch::{EventHandler, dispatch};
use crate::event::{Event, decode_frame};
use crate::stats::DaemonStats;

use super::{Frame, FrameStream, StreamConnector, StreamError};

/// Events buffered between the reader and the dispatcher.
const DISPATCH_QUEUE: usize = 64;

/// How long shutdown waits for queued events to be handled.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    /// Queued events still undelivered after this are abandoned at shutdown.
    pub drain_timeout: Duration,
}

impl ConsumerSettings {
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            idle_timeout: config.idle_timeout(),
            reconnect_initial: config.reconnect_initial(),
            reconnect_max: config.reconnect_max(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

/// Doubling reconnect delay, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay to wait now; the following call returns twice as much.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// How a connection ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    PeerClosed,
}

/// What woke the session loop.
enum Step<'a> {
    Shutdown,
    Ping,
    Idle,
    Slot(Result<Permit<'a, Event>, StreamError>),
    Frame(Result<Option<Frame>, StreamError>),
}

pub struct EventConsumer {
    connector: Arc<dyn StreamConnector>,
    settings: ConsumerSettings,
    stats: Arc<DaemonStats>,
}

impl EventConsumer {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        settings: ConsumerSettings,
        stats: Arc<DaemonStats>,
    ) -> Self {
        Self {
            connector,
            settings,
            stats,
        }
    }

    /// Consume the stream until shutdown or a fatal connect error.
    ///
    /// Events already queued for dispatch are still delivered before this
    /// returns, for at most `drain_timeout`.
    pub async fn run(
        self,
        handler: Arc<dyn EventHandler>,
        mut shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> Result<(), StreamError> {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE);
        let mut dispatcher = tokio::spawn(run_dispatcher(rx, handler, self.stats.clone()));

        let mut parked = None;
        let result = self.read_loop(&tx, &mut parked, &mut shutdown).await;
        if parked.is_some() {
            warn!("Dropping one undispatched event at shutdown");
        }

        drop(tx);
        match tokio::time::timeout(self.settings.drain_timeout, &mut dispatcher).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Event dispatcher task failed"),
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.drain_timeout.as_millis() as u64,
                    "Event dispatcher did not drain in time, abandoning queued events"
                );
                dispatcher.abort();
            }
        }
        result
    }

    async fn read_loop(
        &self,
        tx: &mpsc::Sender<Event>,
        parked: &mut Option<Event>,
        shutdown: &mut broadcast::Receiver<ShutdownSignal>,
    ) -> Result<(), StreamError> {
        let endpoint = self.connector.endpoint().to_string();
        let mut backoff = Backoff::new(self.settings.reconnect_initial, self.settings.reconnect_max);

        loop {
            let connected = tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(stream) => {
                    info!(endpoint = %endpoint, "Event stream connected");
                    self.stats.set_connected(true);
                    backoff.reset();

                    let outcome = self.session(stream, tx, parked, shutdown).await;
                    self.stats.set_connected(false);

                    match outcome {
                        Ok(SessionEnd::Shutdown) => return Ok(()),
                        Ok(SessionEnd::PeerClosed) => {
                            warn!(endpoint = %endpoint, "Event stream closed by peer");
                        }
                        Err(e) => warn!(endpoint = %endpoint, error = %e, "Event stream lost"),
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!(endpoint = %endpoint, error = %e, "Event stream cannot be opened");
                    return Err(e);
                }
                Err(e) => warn!(endpoint = %endpoint, error = %e, "Event stream connect failed"),
            }

            let delay = backoff.next_delay();
            self.stats.reconnecting();
            info!(delay_ms = delay.as_millis() as u64, "Reconnecting to event stream");

            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Read one connection until it ends.
    ///
    /// `parked` holds an event the full queue could not take yet. No frames
    /// are read and the idle timer is paused until it is queued.
    async fn session(
        &self,
        mut stream: Box<dyn FrameStream>,
        tx: &mpsc::Sender<Event>,
        parked: &mut Option<Event>,
        shutdown: &mut broadcast::Receiver<ShutdownSignal>,
    ) -> Result<SessionEnd, StreamError> {
        let ping_every = self.settings.ping_interval;
        let idle_after = self.settings.idle_timeout;

        let mut ping = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let idle = tokio::time::sleep(idle_after);
        tokio::pin!(idle);

        loop {
            let reading = parked.is_none();
            let step = tokio::select! {
                _ = shutdown.recv() => Step::Shutdown,
                _ = ping.tick() => Step::Ping,
                () = &mut idle, if reading => Step::Idle,
                permit = tx.reserve(), if !reading => {
                    Step::Slot(permit.map_err(|_| StreamError::Closed))
                }
                frame = stream.next_frame(), if reading => Step::Frame(frame),
            };

            match step {
                Step::Shutdown => return Ok(SessionEnd::Shutdown),
                Step::Ping => stream.ping().await?,
                Step::Idle => return Err(StreamError::Timeout(idle_after)),
                Step::Slot(permit) => {
                    let permit = permit?;
                    if let Some(event) = parked.take() {
                        permit.send(event);
                    }
                    idle.as_mut().reset(Instant::now() + idle_after);
                }
                Step::Frame(frame) => {
                    let Some(frame) = frame? else {
                        return Ok(SessionEnd::PeerClosed);
                    };
                    idle.as_mut().reset(Instant::now() + idle_after);
                    if let Frame::Text(text) = frame {
                        *parked = self.accept(&text, tx)?;
                    }
                }
            }
        }
    }

    /// Decode a text frame and queue it. Bad frames are logged and dropped.
    ///
    /// Returns the event back when the queue is full.
    fn accept(&self, text: &str, tx: &mpsc::Sender<Event>) -> Result<Option<Event>, StreamError> {
        self.stats.frame_received();
        let event = match decode_frame(text) {
            Ok(event) => event,
            Err(e) => {
                self.stats.frame_rejected();
                warn!(error = %e, "Rejected stream frame");
                return Ok(None);
            }
        };
        match tx.try_send(event) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(event)) => {
                debug!(kind = %event.kind(), "Dispatch queue full, pausing reads");
                Ok(Some(event))
            }
            Err(TrySendError::Closed(_)) => Err(StreamError::Closed),
        }
    }
}

async fn run_dispatcher(
    mut rx: mpsc::Receiver<Event>,
    handler: Arc<dyn EventHandler>,
    stats: Arc<DaemonStats>,
) {
    while let Some(event) = rx.recv().await {
        let result = dispatch(&event, handler.as_ref()).await;
        stats.event_dispatched();
        if let Err(e) = result {
            stats.notify_failed();
            warn!(kind = %event.kind(), error = %e, "Event notification failed");
        }
    }
}
