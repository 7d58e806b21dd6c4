//! Daemon IPC over a Unix domain socket.
//!
//! The daemon serves a small HTTP/JSON API (`/health`, `/status`, `/stop`)
//! that the `ctbot` CLI uses to inspect and stop a running bot.

pub mod client;
pub mod server;
pub mod types;

pub use client::{IpcClient, IpcClientError};
pub use server::IpcState;
pub use types::*;
