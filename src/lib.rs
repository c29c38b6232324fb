// src/lib.rs

//! nanoq - an asynchronous, pure-Rust message-transport runtime.
//!
//! This crate implements the listener side of the runtime: pluggable
//! transports (TCP, IPC, in-process, or externally registered ones) accept
//! inbound connections and hand them to the owning socket as pipes, with
//! typed option dispatch and per-listener statistics along the way.

/// Defines the `Context`, the entry point for creating sockets and
/// resolving listeners.
pub mod context;
/// Custom error types used throughout the library.
pub mod error;
/// Listener lifecycle, registry, and the accept state machine.
pub mod listener;
/// Typed option values and the copyin/copyout codec.
pub mod options;
/// Accepted connections.
pub mod pipe;
/// Small runtime primitives.
pub mod runtime;
/// Sockets: owners of listeners and consumers of pipes.
pub mod socket;
/// Hierarchical runtime statistics.
pub mod stats;
/// Transport traits, endpoint parsing, and the transport registry.
pub mod transport;

pub use context::Context;
pub use error::NqError;
pub use listener::Listener;
pub use options::{OptionSink, OptionValue};
pub use pipe::{Pipe, PipeStream};
pub use socket::{PipeReject, Socket};
pub use stats::{StatCounter, StatItem, StatScope, StatValue};
pub use transport::{parse_endpoint, Endpoint, Transport, TransportListener};

#[cfg(feature = "inproc")]
pub use transport::inproc::connect_inproc;

/// Major version number of the library.
const VERSION_MAJOR: i32 = 0;
/// Minor version number of the library.
const VERSION_MINOR: i32 = 1;
/// Patch version number of the library.
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}
