// src/transport/mod.rs

//! Transport layer: endpoint parsing, the transport traits, and the
//! scheme-keyed transport registry.
//!
//! A [`Transport`] is the listener factory for one URI scheme. The state it
//! creates lives behind the [`TransportListener`] trait for the lifetime of
//! the owning listener; dropping the boxed trait object finalizes it.

pub mod endpoint;
pub mod tcp;

#[cfg(all(unix, feature = "ipc"))]
pub mod ipc;
#[cfg(feature = "inproc")]
pub mod inproc;

pub use endpoint::{parse_endpoint, Endpoint};

use crate::context::Context;
use crate::error::NqError;
use crate::options::{OptionSink, OptionValue};
use crate::pipe::Pipe;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

/// A registered transport: resolves endpoints of one scheme into listener
/// state.
pub trait Transport: Send + Sync + 'static {
  /// The URI scheme this transport serves (e.g. "tcp").
  fn scheme(&self) -> &'static str;

  /// Creates listener-side private state for `endpoint`.
  ///
  /// Nothing is bound yet; binding happens when the listener is started.
  fn listener(
    &self,
    endpoint: Endpoint,
    context: &Context,
  ) -> Result<Box<dyn TransportListener>, NqError>;
}

/// Listener-side operations of a transport.
///
/// One accept is outstanding at a time; the accept state machine never
/// issues a new `accept` before the previous call has resolved.
#[async_trait]
pub trait TransportListener: Send + Sync {
  /// Binds the underlying endpoint. Called at most once, from
  /// `Listener::start`.
  async fn bind(&self) -> Result<(), NqError>;

  /// Waits for one inbound connection.
  async fn accept(&self) -> Result<Pipe, NqError>;

  /// Closes the underlying endpoint. Subsequent accepts fail with
  /// [`NqError::Closed`].
  fn close(&self);

  fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError>;

  fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError>;
}

/// Scheme-keyed transport lookup table, owned by the context.
pub(crate) struct TransportRegistry {
  map: RwLock<HashMap<String, Arc<dyn Transport>>>,
}

impl TransportRegistry {
  /// Builds the registry with the built-in transports registered.
  pub(crate) fn with_defaults() -> Self {
    let reg = Self { map: RwLock::new(HashMap::new()) };
    reg.register(Arc::new(tcp::TcpTransport));
    #[cfg(all(unix, feature = "ipc"))]
    reg.register(Arc::new(ipc::IpcTransport));
    #[cfg(feature = "inproc")]
    reg.register(Arc::new(inproc::InprocTransport));
    reg
  }

  /// Registers `transport`, replacing any previous registration for the
  /// same scheme.
  pub(crate) fn register(&self, transport: Arc<dyn Transport>) {
    let scheme = transport.scheme().to_string();
    tracing::debug!(scheme = %scheme, "registering transport");
    self.map.write().insert(scheme, transport);
  }

  pub(crate) fn find(&self, scheme: &str) -> Option<Arc<dyn Transport>> {
    self.map.read().get(scheme).cloned()
  }
}
