// src/listener/mod.rs

//! Listeners: the accept side of one transport endpoint bound to a socket.
//!
//! A listener is created against a socket and a URL, registered in the
//! context's ID table, and once started drives its transport's accept
//! operation from a dedicated task. Accepted connections are forwarded to
//! the owning socket as pipes. Closing is idempotent: the first close
//! removes the ID so no new holder can find the listener, cancels and joins
//! the accept machinery, and releases the creation-time reference. The
//! listener is reclaimed when the last reference is dropped, never under
//! the registry lock.

pub(crate) mod accept;
pub(crate) mod registry;

use crate::context::Context;
use crate::error::NqError;
use crate::options::{copyout_str, OptionSink, OptionValue, OPT_URL};
use crate::pipe::Pipe;
use crate::socket::{PipeReject, Socket};
use crate::stats::{StatCounter, StatItem, StatScope};
use crate::transport::{parse_endpoint, Endpoint, Transport, TransportListener};

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-listener counters, shared with the pipes the listener creates.
#[derive(Debug)]
pub(crate) struct ListenerStats {
  pub(crate) npipes: Arc<StatCounter>,
  pub(crate) accept: Arc<StatCounter>,
  pub(crate) aborted: Arc<StatCounter>,
  pub(crate) timedout: Arc<StatCounter>,
  pub(crate) canceled: Arc<StatCounter>,
  pub(crate) othererr: Arc<StatCounter>,
  pub(crate) protoreject: Arc<StatCounter>,
  pub(crate) appreject: Arc<StatCounter>,
}

impl ListenerStats {
  fn new() -> Self {
    Self {
      npipes: Arc::new(StatCounter::default()),
      accept: Arc::new(StatCounter::default()),
      aborted: Arc::new(StatCounter::default()),
      timedout: Arc::new(StatCounter::default()),
      canceled: Arc::new(StatCounter::default()),
      othererr: Arc::new(StatCounter::default()),
      protoreject: Arc::new(StatCounter::default()),
      appreject: Arc::new(StatCounter::default()),
    }
  }

  /// Builds the `listener{id}` scope once identity is known.
  fn build_scope(&self, id: u32, socket_id: usize, url: &str) -> Arc<StatScope> {
    let scope = StatScope::new(format!("listener{}", id), "listener statistics");
    scope.append_item(StatItem::id("id", "listener id", id as u64));
    scope.append_item(StatItem::id("socket", "socket for listener", socket_id as u64));
    scope.append_item(StatItem::string("url", "listener url", url));
    scope.append_item(StatItem::counter("npipes", "open pipes", self.npipes.clone()));
    scope.append_item(StatItem::counter("accept", "connections accepted", self.accept.clone()));
    scope.append_item(StatItem::counter("aborted", "accepts aborted remotely", self.aborted.clone()));
    scope.append_item(StatItem::counter("timedout", "accepts timed out", self.timedout.clone()));
    scope.append_item(StatItem::counter("canceled", "accepts canceled", self.canceled.clone()));
    scope.append_item(StatItem::counter("othererr", "other accept errors", self.othererr.clone()));
    scope.append_item(StatItem::counter(
      "protoreject",
      "pipes rejected by protocol",
      self.protoreject.clone(),
    ));
    scope.append_item(StatItem::counter(
      "appreject",
      "pipes rejected by application",
      self.appreject.clone(),
    ));
    scope
  }
}

/// The accept side of one transport endpoint bound to a socket.
pub struct Listener {
  id: AtomicU32,
  endpoint: Endpoint,
  socket: Weak<Socket>,
  context: Context,
  transport: Box<dyn TransportListener>,
  started: AtomicBool,
  closing: AtomicBool,
  /// Guarded by the registry lock; see `ListenerRegistry::mark_closed`.
  closed: AtomicBool,
  cancel: CancellationToken,
  accept_task: Mutex<Option<JoinHandle<()>>>,
  stats: Arc<ListenerStats>,
  stats_scope: OnceLock<Arc<StatScope>>,
}

impl Listener {
  /// Creates a listener for `url` owned by `socket`.
  ///
  /// The transport's private state is initialized first; the ID is only
  /// assigned (and the listener only becomes findable) after that
  /// succeeds. Any later failure tears down everything that was set up and
  /// propagates the original error; no partial listener stays reachable.
  pub(crate) fn create(
    context: &Context,
    socket: &Arc<Socket>,
    url: &str,
  ) -> Result<Arc<Listener>, NqError> {
    let endpoint = parse_endpoint(url)?;
    let transport = context
      .inner()
      .transports()
      .find(endpoint.scheme())
      .ok_or_else(|| NqError::UnsupportedTransport(url.to_string()))?;
    let transport_listener = transport.listener(endpoint.clone(), context)?;

    let listener = Arc::new(Listener {
      id: AtomicU32::new(0),
      endpoint,
      socket: Arc::downgrade(socket),
      context: context.clone(),
      transport: transport_listener,
      started: AtomicBool::new(false),
      closing: AtomicBool::new(false),
      closed: AtomicBool::new(false),
      cancel: CancellationToken::new(),
      accept_task: Mutex::new(None),
      stats: Arc::new(ListenerStats::new()),
      stats_scope: OnceLock::new(),
    });
    // From here on, reclamation of this handle is tracked by the context's
    // wait group; `Drop` pairs with this add.
    context.inner().listener_wg().add(1);

    let id = context.inner().listeners().register(&listener)?;
    listener.id.store(id, Ordering::Release);

    if let Err(e) = socket.add_listener(listener.clone()) {
      context.inner().listeners().remove(id);
      return Err(e);
    }

    let scope = listener.stats.build_scope(id, socket.id(), listener.uri());
    let _ = listener.stats_scope.set(scope.clone());
    context.inner().stats().register(scope);

    tracing::debug!(listener_id = id, uri = %listener.uri(), socket_id = socket.id(), "listener created");
    Ok(listener)
  }

  /// Process-unique listener ID.
  pub fn id(&self) -> u32 {
    self.id.load(Ordering::Acquire)
  }

  /// The URL the listener was created with.
  pub fn uri(&self) -> &str {
    self.endpoint.uri()
  }

  /// The owning socket, if it is still alive.
  pub fn socket(&self) -> Option<Arc<Socket>> {
    self.socket.upgrade()
  }

  /// Adds a reference for a caller that must keep the listener alive
  /// across an operation; fails with `Closed` once the listener has been
  /// closed. Dropping the returned handle releases the reference.
  pub fn hold(self: &Arc<Self>) -> Result<Arc<Listener>, NqError> {
    self.context.inner().listeners().hold(self)
  }

  pub(crate) fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  pub(crate) fn set_closed(&self) {
    self.closed.store(true, Ordering::Release);
  }

  pub(crate) fn transport(&self) -> &dyn TransportListener {
    self.transport.as_ref()
  }

  pub(crate) fn stats(&self) -> &Arc<ListenerStats> {
    &self.stats
  }

  /// Starts accepting. Fails with `InvalidState` on a second start; a bind
  /// failure reverts the started flag so a corrected retry is possible.
  pub async fn start(self: &Arc<Self>) -> Result<(), NqError> {
    if self.started.swap(true, Ordering::AcqRel) {
      return Err(NqError::InvalidState("listener already started"));
    }

    if let Err(e) = self.transport.bind().await {
      self.started.store(false, Ordering::Release);
      tracing::debug!(listener_id = self.id(), uri = %self.uri(), error = %e, "listener bind failed");
      return Err(e);
    }

    let task = tokio::spawn(accept::accept_loop(self.clone(), self.cancel.clone()));
    *self.accept_task.lock() = Some(task);

    // A close may have raced us between bind and task installation; it
    // would have found no task to join, so join it here.
    if self.closing.load(Ordering::Acquire) {
      let task = self.accept_task.lock().take();
      if let Some(task) = task {
        let _ = task.await;
      }
    }
    Ok(())
  }

  /// Stops the asynchronous accept machinery: cancels the in-flight accept
  /// and any pending cooldown, closes the transport, and blocks until the
  /// accept task has fully returned.
  pub(crate) async fn shutdown(&self) {
    self.closing.store(true, Ordering::Release);
    self.cancel.cancel();
    self.transport.close();

    let task = self.accept_task.lock().take();
    if let Some(task) = task {
      if let Err(e) = task.await {
        if !e.is_cancelled() {
          tracing::error!(listener_id = self.id(), "accept loop task panicked: {:?}", e);
        }
      }
    }
  }

  /// Closes the listener and releases the caller's reference. Idempotent:
  /// only the first close deregisters the ID and drives shutdown.
  pub async fn close(self: Arc<Self>) {
    if !self.context.inner().listeners().mark_closed(&self) {
      return;
    }

    // Remove from the table first so no new holder can be found by ID.
    self.context.inner().listeners().remove(self.id());
    if let Some(socket) = self.socket.upgrade() {
      socket.remove_listener(self.id());
    }

    self.shutdown().await;
    tracing::debug!(listener_id = self.id(), uri = %self.uri(), "listener closed");
  }

  /// Bookkeeping-only close for a caller that has already driven shutdown
  /// itself (the owning socket, while holding its own lock): marks closed,
  /// deregisters the ID, and releases the caller's reference without
  /// re-invoking shutdown.
  pub fn close_after_shutdown(self: Arc<Self>) {
    if !self.context.inner().listeners().mark_closed(&self) {
      return;
    }
    self.context.inner().listeners().remove(self.id());
    tracing::debug!(listener_id = self.id(), uri = %self.uri(), "listener closed (shutdown already done)");
  }

  /// Hands an accepted connection to the owning socket.
  pub(crate) fn forward_pipe(&self, mut pipe: Pipe) {
    let socket = match self.socket.upgrade() {
      Some(s) => s,
      None => {
        tracing::debug!(listener_id = self.id(), "owning socket is gone; dropping accepted pipe");
        return;
      }
    };
    pipe.attach_listener_stats(self.stats.clone());
    match socket.deliver_pipe(pipe) {
      Ok(()) => {}
      Err(PipeReject::Protocol) => self.stats.protoreject.inc(),
      Err(PipeReject::Application) => self.stats.appreject.inc(),
    }
  }

  /// Sets a listener option. The URL is fixed at creation; writes to it
  /// are rejected as read-only before the transport is consulted.
  pub fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError> {
    if name == OPT_URL {
      return Err(NqError::ReadOnly);
    }
    self.transport.set_option(name, value)
  }

  /// Gets a listener option. The transport's table is consulted first (it
  /// may override `url` to expose resolved wildcards); unmatched names fall
  /// back to the raw URL and then to the owning socket's options.
  pub fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
    match self.transport.get_option(name, dst) {
      Err(NqError::UnsupportedOption(_)) => {}
      other => return other,
    }

    if name == OPT_URL {
      return copyout_str(self.uri(), dst);
    }

    match self.socket.upgrade() {
      Some(socket) => socket.get_option(name, dst),
      None => Err(NqError::Closed),
    }
  }

  /// Appends an additional statistic to this listener's subtree. Protocol
  /// layers use this to publish their own per-listener counters.
  pub fn add_stat(&self, item: StatItem) {
    if let Some(scope) = self.stats_scope.get() {
      scope.append_item(item);
    }
  }
}

impl Drop for Listener {
  fn drop(&mut self) {
    if let Some(scope) = self.stats_scope.get() {
      self.context.inner().stats().deregister(scope);
    }
    tracing::trace!(listener_id = self.id(), "listener reaped");
    self.context.inner().listener_wg().done();
  }
}

impl std::fmt::Debug for Listener {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Listener")
      .field("id", &self.id())
      .field("uri", &self.uri())
      .field("started", &self.started.load(Ordering::Relaxed))
      .field("closed", &self.closed.load(Ordering::Relaxed))
      .finish()
  }
}
