//! Runtime counters shared by the daemon's tasks and reported over IPC.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct DaemonStats {
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    events_dispatched: AtomicU64,
    notify_failures: AtomicU64,
    commands_handled: AtomicU64,
    usage_errors: AtomicU64,
    reconnects: AtomicU64,
    stream_connected: AtomicBool,
}

/// Point-in-time copy of [`DaemonStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub events_dispatched: u64,
    pub notify_failures: u64,
    pub commands_handled: u64,
    pub usage_errors: u64,
    pub reconnects: u64,
    pub stream_connected: bool,
}

impl DaemonStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notify_failed(&self) {
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_handled(&self) {
        self.commands_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn usage_error(&self) {
        self.usage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnecting(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_connected(&self, connected: bool) {
        self.stream_connected.store(connected, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            commands_handled: self.commands_handled.load(Ordering::Relaxed),
            usage_errors: self.usage_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            stream_connected: self.stream_connected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counters_accumulate() {
        let stats = DaemonStats::new();
        stats.frame_received();
        stats.frame_received();
        stats.frame_rejected();
        stats.reconnecting();
        stats.set_connected(true);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                frames_received: 2,
                frames_rejected: 1,
                reconnects: 1,
                stream_connected: true,
                ..StatsSnapshot::default()
            }
        );
    }
}
