//! Configuration builders for tests.

use std::path::Path;

use ctbot_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .prefix("?")
///     .socket_path(dir.path().join("ctbot.sock"))
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.daemon.socket_path = path.as_ref().display().to_string();
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.config.commands.prefix = prefix.to_string();
        self
    }

    pub fn javadocs_limit(mut self, limit: usize) -> Self {
        self.config.commands.javadocs_limit = limit;
        self
    }

    pub fn stream_enabled(mut self, enabled: bool) -> Self {
        self.config.stream.enabled = enabled;
        self
    }

    pub fn stream_url(mut self, url: &str) -> Self {
        self.config.stream.url = url.to_string();
        self
    }

    /// Shortest timings validation allows: ping every second, reconnect
    /// after `reconnect_ms`.
    pub fn fast_stream(mut self, reconnect_ms: u64) -> Self {
        self.config.stream.ping_interval_secs = 1;
        self.config.stream.idle_timeout_secs = 30;
        self.config.stream.reconnect_initial_ms = reconnect_ms;
        self.config.stream.reconnect_max_secs = 1;
        self
    }

    pub fn corpus_paths(mut self, docs: impl AsRef<Path>, mappings: impl AsRef<Path>) -> Self {
        self.config.corpus.docs_path = docs.as_ref().display().to_string();
        self.config.corpus.mappings_path = mappings.as_ref().display().to_string();
        self
    }

    pub fn sink(mut self, sink: &str) -> Self {
        self.config.notify.sink = sink.to_string();
        self
    }

    pub fn rate_limit(mut self, max_tokens: u32, refill_secs: u64) -> Self {
        self.config.rate_limit.max_tokens = max_tokens;
        self.config.rate_limit.refill_secs = refill_secs;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
