// src/transport/inproc.rs

#![cfg(feature = "inproc")]

use crate::context::{Context, InprocBinding};
use crate::error::NqError;
use crate::options::{self, OptionEntry, OptionSink, OptionValue};
use crate::pipe::{Pipe, PipeStream};
use crate::transport::{Endpoint, Transport, TransportListener};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Buffered bytes per direction of an in-process stream.
const INPROC_STREAM_CAPACITY: usize = 64 * 1024;
/// Connection attempts that may queue before connectors are pushed back.
const INPROC_PENDING_CONNECTS: usize = 64;

/// One half of a rendezvous: the connector's end of the duplex stream,
/// handed to the bound listener through the context registry.
pub(crate) struct InprocPeer {
  pub(crate) stream: tokio::io::DuplexStream,
  pub(crate) peer_uri: String,
}

pub struct InprocTransport;

impl Transport for InprocTransport {
  fn scheme(&self) -> &'static str {
    "inproc"
  }

  fn listener(
    &self,
    endpoint: Endpoint,
    context: &Context,
  ) -> Result<Box<dyn TransportListener>, NqError> {
    let (name, uri) = match endpoint {
      Endpoint::Inproc(name, uri) => (name, uri),
      other => return Err(NqError::InvalidEndpoint(other.uri().to_string())),
    };
    Ok(Box::new(InprocListenerState {
      name,
      uri,
      handle_source: context.inner().handle_source(),
      context: context.clone(),
      accept_rx: Mutex::new(None),
      binding_id: AtomicUsize::new(0),
      closed: AtomicBool::new(false),
    }))
  }
}

pub(crate) struct InprocListenerState {
  name: String,
  uri: String,
  handle_source: Arc<AtomicUsize>,
  context: Context,
  accept_rx: Mutex<Option<async_channel::Receiver<InprocPeer>>>,
  /// Identifies our registration so close never evicts a newer binding
  /// that reused the name.
  binding_id: AtomicUsize,
  closed: AtomicBool,
}

#[async_trait]
impl TransportListener for InprocListenerState {
  async fn bind(&self) -> Result<(), NqError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(NqError::Closed);
    }
    if self.accept_rx.lock().is_some() {
      return Err(NqError::InvalidState("listener already bound"));
    }

    let (tx, rx) = async_channel::bounded::<InprocPeer>(INPROC_PENDING_CONNECTS);
    let binding_id = self.handle_source.fetch_add(1, Ordering::Relaxed);
    self
      .context
      .inner()
      .register_inproc(&self.name, InprocBinding { id: binding_id, tx })?;
    self.binding_id.store(binding_id, Ordering::Release);
    *self.accept_rx.lock() = Some(rx);
    tracing::info!(uri = %self.uri, "inproc listener bound");
    Ok(())
  }

  async fn accept(&self) -> Result<Pipe, NqError> {
    let rx = {
      let guard = self.accept_rx.lock();
      if self.closed.load(Ordering::Acquire) {
        return Err(NqError::Closed);
      }
      match guard.as_ref() {
        Some(rx) => rx.clone(),
        None => return Err(NqError::InvalidState("listener not bound")),
      }
    };

    let peer = rx.recv().await.map_err(|_| NqError::Closed)?;
    let id = self.handle_source.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(uri = %self.uri, peer = %peer.peer_uri, pipe_id = id, "accepted inproc connection");
    Ok(Pipe::new(id, peer.peer_uri, PipeStream::Inproc(peer.stream)))
  }

  fn close(&self) {
    self.closed.store(true, Ordering::Release);
    if let Some(rx) = self.accept_rx.lock().take() {
      rx.close();
      self
        .context
        .inner()
        .unregister_inproc(&self.name, self.binding_id.load(Ordering::Acquire));
      tracing::debug!(uri = %self.uri, "inproc listener closed");
    }
  }

  fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
    options::table_get(INPROC_OPTIONS, self, name, dst)
  }

  fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError> {
    options::table_set(INPROC_OPTIONS, self, name, value)
  }
}

// Inproc has no transport-tunable state; everything falls through to the
// synthetic URL getter and the socket options.
static INPROC_OPTIONS: &[OptionEntry<InprocListenerState>] = &[];

/// Connects to a bound in-process listener, returning the connector-side
/// pipe. The listener observes the peer through its accept loop.
pub async fn connect_inproc(context: &Context, name: &str) -> Result<Pipe, NqError> {
  let binding = context
    .inner()
    .lookup_inproc(name)
    .ok_or_else(|| NqError::ConnectionRefused(format!("inproc://{}", name)))?;

  let (local, remote) = tokio::io::duplex(INPROC_STREAM_CAPACITY);
  let uri = format!("inproc://{}", name);
  binding
    .tx
    .send(InprocPeer { stream: remote, peer_uri: uri.clone() })
    .await
    .map_err(|_| NqError::ConnectionRefused(uri.clone()))?;

  let id = context.inner().handle_source().fetch_add(1, Ordering::Relaxed);
  Ok(Pipe::new(id, uri, PipeStream::Inproc(local)))
}
