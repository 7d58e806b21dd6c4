#![deny(unsafe_code)]

//! Shared test utilities for the ctbot workspace.
//!
//! Provides config builders, sample corpora and frames, a recording
//! notification sink, a scripted event stream, and a daemon harness so that
//! crate tests stay short and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! ctbot-test-utils = { workspace = true }
//! ```
//!
//! Only integration tests (`tests/`) should use it from `ctbot-core`; unit
//! tests inside the crate would see a second copy of its types.

pub mod config;
pub mod daemon;
pub mod fixtures;
pub mod sink;
pub mod stream;
pub mod tracing_setup;
