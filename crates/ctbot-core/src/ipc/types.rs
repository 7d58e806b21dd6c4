//! JSON bodies exchanged between the daemon and the CLI.

use serde::{Deserialize, Serialize};

use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub uptime_secs: u64,
    pub pid: u32,
    pub command_prefix: String,
    pub stream_enabled: bool,
    pub stream_url: String,
    pub notify_sink: String,
    pub doc_terms: usize,
    /// `None` when the mapping service cannot report its size.
    pub mapping_entries: Option<usize>,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub acknowledged: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
