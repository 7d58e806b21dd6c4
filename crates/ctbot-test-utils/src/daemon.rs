//! Daemon test harness.
//!
//! [`TestDaemon`] builds a [`Daemon`] over the sample corpora and a
//! [`RecordingSink`], with its IPC socket in a temp directory that is
//! removed on drop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ctbot_config::AppConfig;
use ctbot_core::stream::StreamConnector;
use ctbot_core::{Daemon, DaemonError, Envelope};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::config::TestConfigBuilder;
use crate::fixtures::{sample_docs, sample_mappings};
use crate::sink::RecordingSink;

pub struct TestDaemon {
    pub daemon: Arc<Daemon>,
    pub sink: Arc<RecordingSink>,
    pub socket_path: PathBuf,
    handle: Option<JoinHandle<Result<(), DaemonError>>>,
    _temp_dir: TempDir,
}

impl TestDaemon {
    /// A daemon with default settings, fast stream timings, and a temp socket.
    pub fn new() -> Self {
        Self::with_builder(TestConfigBuilder::new())
    }

    /// Build from `builder`; the socket path is always overridden.
    pub fn with_builder(builder: TestConfigBuilder) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("ctbot.sock");
        let config: AppConfig = builder.socket_path(&socket_path).fast_stream(5).build();
        config.validate().expect("test config must be valid");

        let sink = Arc::new(RecordingSink::new());
        let daemon = Daemon::new(
            config,
            Arc::new(sample_docs()),
            Arc::new(sample_mappings()),
            sink.clone(),
        );

        Self {
            daemon: Arc::new(daemon),
            sink,
            socket_path,
            handle: None,
            _temp_dir: temp_dir,
        }
    }

    /// Start `run_with` in the background and wait for the IPC socket.
    pub async fn start(&mut self, connector: Option<Arc<dyn StreamConnector>>) {
        let daemon = self.daemon.clone();
        self.handle = Some(tokio::spawn(async move { daemon.run_with(connector).await }));

        for _ in 0..200 {
            if self.socket_path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("IPC socket never appeared at {}", self.socket_path.display());
    }

    /// Publish a chat line on the daemon's message bus.
    pub fn say(&self, author: &str, line: &str) {
        self.daemon
            .message_sender()
            .send(Envelope::new("test", author, line))
            .expect("command loop is subscribed");
    }

    /// Request shutdown and wait for `run_with` to return.
    pub async fn stop(&mut self) -> Result<(), DaemonError> {
        self.daemon.shutdown();
        self.join().await
    }

    /// Wait for `run_with` to return without requesting shutdown.
    pub async fn join(&mut self) -> Result<(), DaemonError> {
        let handle = self.handle.take().expect("daemon was not started");
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon did not stop in time")
            .expect("daemon task panicked")
    }
}

impl Default for TestDaemon {
    fn default() -> Self {
        Self::new()
    }
}
