//! Core daemon process: startup, shutdown, and the task layout.
//!
//! `run` starts three long-lived tasks on one `JoinSet`:
//!
//! - the stream consumer (events, in order, one at a time)
//! - the command loop (one spawned task per inbound chat line)
//! - the IPC server
//!
//! and then waits for a shutdown signal from IPC, Ctrl-C, or [`Daemon::shutdown`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use ctbot_config::AppConfig;

use crate::build_info;
use crate::command::CommandParser;
use crate::corpus::{CorpusError, DocCorpus, MappingIndex, MappingService};
use crate::dispatch::{EventHandler, NotifyingHandler};
use crate::ipc::{self, IpcState};
use crate::message::Envelope;
use crate::notify::{self, NotificationSink, NotifyError};
use crate::router::{CommandRouter, RouteOutcome};
use crate::stats::DaemonStats;
use crate::stream::{ConsumerSettings, EventConsumer, StreamConnector, WebSocketConnector};

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// The ctbot service object. Owns every piece of shared state.
pub struct Daemon {
    config: AppConfig,
    router: Arc<CommandRouter>,
    sink: Arc<dyn NotificationSink>,
    stats: Arc<DaemonStats>,
    doc_terms: usize,
    mapping_entries: Option<usize>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    _shutdown_rx: broadcast::Receiver<ShutdownSignal>,
    message_tx: broadcast::Sender<Envelope>,
    _message_rx: broadcast::Receiver<Envelope>,
}

impl Daemon {
    pub fn new(
        config: AppConfig,
        docs: Arc<DocCorpus>,
        mappings: Arc<dyn MappingService>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        let (message_tx, _message_rx) = broadcast::channel(256);

        let doc_terms = docs.len();
        let mapping_entries = mappings.entry_count();
        let router = CommandRouter::new(
            CommandParser::new(config.commands.prefix.clone()),
            config.commands.javadocs_limit,
            docs,
            mappings,
        );

        Self {
            config,
            router: Arc::new(router),
            sink,
            stats: Arc::new(DaemonStats::new()),
            doc_terms,
            mapping_entries,
            shutdown_tx,
            _shutdown_rx,
            message_tx,
            _message_rx,
        }
    }

    /// Load both corpora and build the configured sink.
    pub async fn from_config(config: AppConfig) -> Result<Self, DaemonError> {
        let docs = DocCorpus::load(Path::new(&config.corpus.docs_path)).await?;
        let mappings = MappingIndex::load(Path::new(&config.corpus.mappings_path)).await?;
        let sink: Arc<dyn NotificationSink> = Arc::from(notify::sink_from_config(&config.notify)?);
        Ok(Self::new(config, Arc::new(docs), Arc::new(mappings), sink))
    }

    /// Run with the websocket transport from config (or none if disabled).
    pub async fn run(&self) -> Result<(), DaemonError> {
        let connector = self.config.stream.enabled.then(|| {
            Arc::new(WebSocketConnector::new(self.config.stream.url.clone())) as Arc<dyn StreamConnector>
        });
        self.run_with(connector).await
    }

    /// Run until shutdown, reading events from `connector` if one is given.
    pub async fn run_with(&self, connector: Option<Arc<dyn StreamConnector>>) -> Result<(), DaemonError> {
        info!(
            version = %build_info::version_string(),
            prefix = %self.config.commands.prefix,
            doc_terms = self.doc_terms,
            sink = self.sink.name(),
            stream = connector.as_ref().map(|c| c.endpoint()).unwrap_or("disabled"),
            "ctbot daemon starting"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut tasks = JoinSet::new();

        if let Some(connector) = connector {
            self.spawn_consumer(&mut tasks, connector);
        }
        self.spawn_command_loop(&mut tasks);
        self.spawn_ipc(&mut tasks);

        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping daemon");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C received, initiating graceful shutdown");
                let _ = self.shutdown_tx.send(ShutdownSignal);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Daemon task failed");
            }
        }

        info!("Daemon stopped");
        Ok(())
    }

    fn spawn_consumer(&self, tasks: &mut JoinSet<()>, connector: Arc<dyn StreamConnector>) {
        let consumer = EventConsumer::new(
            connector,
            ConsumerSettings::from_config(&self.config.stream),
            self.stats.clone(),
        );
        let handler: Arc<dyn EventHandler> = Arc::new(NotifyingHandler::new(
            self.sink.clone(),
            self.config.notify.module_url_base.clone(),
        ));
        let shutdown_rx = self.shutdown_tx.subscribe();

        tasks.spawn(async move {
            if let Err(e) = consumer.run(handler, shutdown_rx).await {
                error!(error = %e, "Event stream consumer stopped");
            }
        });
    }

    fn spawn_command_loop(&self, tasks: &mut JoinSet<()>) {
        let mut messages = self.message_tx.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let router = self.router.clone();
        let sink = self.sink.clone();
        let stats = self.stats.clone();

        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    received = messages.recv() => match received {
                        Ok(envelope) => {
                            let (router, sink, stats) = (router.clone(), sink.clone(), stats.clone());
                            tokio::spawn(async move {
                                handle_envelope(&router, sink.as_ref(), &stats, &envelope).await;
                            });
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Command loop fell behind, messages dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!("Command loop stopped");
        });
    }

    fn spawn_ipc(&self, tasks: &mut JoinSet<()>) {
        let state = Arc::new(IpcState {
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            stats: self.stats.clone(),
            doc_terms: self.doc_terms,
            mapping_entries: self.mapping_entries,
            started_at: Instant::now(),
        });
        let socket_path = PathBuf::from(&self.config.daemon.socket_path);
        let shutdown_rx = self.shutdown_tx.subscribe();

        tasks.spawn(async move {
            if let Err(e) = ipc::server::serve(&socket_path, state, shutdown_rx).await {
                error!(path = %socket_path.display(), error = %e, "IPC server failed");
            }
        });
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// Get a sender for the message bus.
    pub fn message_sender(&self) -> broadcast::Sender<Envelope> {
        self.message_tx.clone()
    }

    /// Subscribe to the message bus.
    pub fn message_subscriber(&self) -> broadcast::Receiver<Envelope> {
        self.message_tx.subscribe()
    }

    pub fn shutdown_subscriber(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    pub fn router(&self) -> Arc<CommandRouter> {
        self.router.clone()
    }

    pub fn stats(&self) -> Arc<DaemonStats> {
        self.stats.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Answer one chat line and send the reply, if any.
///
/// Errors stop at this boundary: a failed send is counted and logged.
pub async fn handle_envelope(
    router: &CommandRouter,
    sink: &dyn NotificationSink,
    stats: &DaemonStats,
    envelope: &Envelope,
) -> RouteOutcome {
    let outcome = router.handle(&envelope.body, &envelope.author);
    match &outcome {
        RouteOutcome::Reply(request, _) => {
            stats.command_handled();
            info!(command = request.name(), author = %envelope.author, channel = %envelope.channel, "Command handled");
        }
        RouteOutcome::Usage(..) => stats.usage_error(),
        RouteOutcome::NotACommand | RouteOutcome::Unknown(_) => {}
    }

    if let Some(notification) = outcome.notification()
        && let Err(e) = sink.send(notification).await
    {
        stats.notify_failed();
        warn!(sink = sink.name(), error = %e, "Failed to send command reply");
    }
    outcome
}

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("notification sink: {0}")]
    Notify(#[from] NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
