#![deny(unsafe_code)]

//! ctbot core runtime.
//!
//! Listens to the module event stream and turns events into chat
//! notifications, and answers `javadocs`/`mcp` lookups by fuzzy matching
//! against two read-only corpora. The [`Daemon`] owns all shared state;
//! chat adapters and the CLI talk to it through the message bus and IPC.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future. Return type for async trait
/// methods that are used through `dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Command-line parsing into typed requests.
pub mod command;
/// Documentation and mapping corpora.
pub mod corpus;
/// Async daemon runtime and message bus.
pub mod daemon;
/// Event-to-handler dispatch.
pub mod dispatch;
/// Stream event types and the frame decoder.
pub mod event;
/// Fuzzy string similarity and top-K extraction.
pub mod fuzzy;
/// Unix socket control API.
pub mod ipc;
/// Message envelope types for the internal bus.
pub mod message;
/// Notification content and sinks.
pub mod notify;
/// Command routing and replies.
pub mod router;
/// Runtime counters.
pub mod stats;
/// Push-stream transport and consumer.
pub mod stream;

pub use command::{CommandParser, CommandRequest, MappingKind, McpQuery, UsageError};
pub use corpus::{DocCorpus, MappingIndex, MappingService, SearchTerm};
pub use daemon::{Daemon, DaemonError, ShutdownSignal};
pub use event::{DecodeError, Event, EventKind, decode_frame};
pub use message::Envelope;
pub use notify::{Notification, NotificationSink, NotifyError};
pub use router::{CommandRouter, RouteOutcome};
pub use stats::{DaemonStats, StatsSnapshot};
