//! Async chat service: bridges transport lines to the daemon message bus.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use ctbot_config::AppConfig;
use ctbot_core::Envelope;

use crate::ChatError;
use crate::message::ChatMessage;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

/// Buckets are swept after this many submitted lines.
const CLEANUP_EVERY: u64 = 512;

#[derive(Debug)]
enum ServiceCommand {
    Submit(ChatMessage),
    Shutdown,
}

/// What happened to one inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Published to the bus.
    Published,
    /// Not prefixed; never reaches the daemon.
    Ignored,
}

/// Runs as a tokio task and owns the rate limiter.
pub struct ChatService {
    command_rx: mpsc::Receiver<ServiceCommand>,
    bus_tx: broadcast::Sender<Envelope>,
    prefix: String,
    rate_limiter: RateLimiter,
    seen: u64,
}

/// Cloneable handle used by transports.
#[derive(Clone)]
pub struct ChatServiceHandle {
    command_tx: mpsc::Sender<ServiceCommand>,
}

impl ChatServiceHandle {
    /// Queue an inbound line for the service.
    pub async fn submit(&self, msg: ChatMessage) -> Result<(), ChatError> {
        self.command_tx
            .send(ServiceCommand::Submit(msg))
            .await
            .map_err(|_| ChatError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.command_tx
            .send(ServiceCommand::Shutdown)
            .await
            .map_err(|_| ChatError::Closed)
    }
}

impl ChatService {
    pub fn new(
        bus_tx: broadcast::Sender<Envelope>,
        prefix: impl Into<String>,
        rate_limit: RateLimitConfig,
    ) -> (Self, ChatServiceHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);

        let service = Self {
            command_rx,
            bus_tx,
            prefix: prefix.into(),
            rate_limiter: RateLimiter::new(rate_limit),
            seen: 0,
        };

        (service, ChatServiceHandle { command_tx })
    }

    /// Build from the command prefix and rate limit in `config`.
    pub fn from_config(bus_tx: broadcast::Sender<Envelope>, config: &AppConfig) -> (Self, ChatServiceHandle) {
        Self::new(
            bus_tx,
            config.commands.prefix.clone(),
            RateLimitConfig::from_settings(&config.rate_limit),
        )
    }

    /// Run until [`ChatServiceHandle::shutdown`] or every handle is dropped.
    pub async fn run(mut self) {
        info!(prefix = %self.prefix, "Chat service started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                ServiceCommand::Submit(msg) => {
                    if let Err(e) = self.process_inbound(msg) {
                        warn!(error = %e, "Inbound chat line dropped");
                    }
                }
                ServiceCommand::Shutdown => {
                    info!("Chat service shutting down");
                    break;
                }
            }
        }

        info!("Chat service stopped");
    }

    /// Filter, rate-limit, and publish one line.
    pub fn process_inbound(&mut self, msg: ChatMessage) -> Result<Inbound, ChatError> {
        self.seen += 1;
        if self.seen.is_multiple_of(CLEANUP_EVERY) {
            self.rate_limiter.cleanup();
        }

        if !msg.has_prefix(&self.prefix) {
            return Ok(Inbound::Ignored);
        }

        if !self.rate_limiter.try_acquire(&msg.author) {
            return Err(ChatError::RateLimited { author: msg.author });
        }

        debug!(author = %msg.author, channel = %msg.channel, "Chat command routed to bus");
        self.bus_tx
            .send(msg.into_envelope())
            .map_err(|_| ChatError::BusClosed)?;
        Ok(Inbound::Published)
    }
}
