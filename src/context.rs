// src/context.rs

use crate::error::NqError;
use crate::listener::registry::ListenerRegistry;
use crate::listener::Listener;
use crate::runtime::WaitGroup;
use crate::socket::Socket;
use crate::stats::StatsRegistry;
use crate::transport::{Transport, TransportRegistry};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;

#[cfg(feature = "inproc")]
use crate::transport::inproc::InprocPeer;

/// Information stored in the inproc registry for a bound endpoint.
/// In-process connectors use it to reach the binder's accept loop.
#[cfg(feature = "inproc")]
#[derive(Debug, Clone)]
pub(crate) struct InprocBinding {
  /// Identifies the registration, so a closing listener never evicts a
  /// newer binding that reused its name.
  pub(crate) id: usize,
  pub(crate) tx: async_channel::Sender<InprocPeer>,
}

/// State shared by every `Context` handle.
pub(crate) struct ContextInner {
  /// Source for the next unique handle ID (sockets, pipes, bindings).
  next_handle: Arc<AtomicUsize>,
  sockets: RwLock<HashMap<usize, Weak<Socket>>>,
  listeners: ListenerRegistry,
  transports: TransportRegistry,
  stats: StatsRegistry,
  #[cfg(feature = "inproc")]
  inproc_registry: RwLock<HashMap<String, InprocBinding>>,
  /// Tracks live listener handles; drained by `Context::term`.
  listener_wg: WaitGroup,
  shutdown_initiated: AtomicBool,
}

impl ContextInner {
  fn new() -> Self {
    Self {
      next_handle: Arc::new(AtomicUsize::new(1)),
      sockets: RwLock::new(HashMap::new()),
      listeners: ListenerRegistry::new(),
      transports: TransportRegistry::with_defaults(),
      stats: StatsRegistry::new(),
      #[cfg(feature = "inproc")]
      inproc_registry: RwLock::new(HashMap::new()),
      listener_wg: WaitGroup::new(),
      shutdown_initiated: AtomicBool::new(false),
    }
  }

  pub(crate) fn next_handle(&self) -> usize {
    self.next_handle.fetch_add(1, AtomicOrdering::Relaxed)
  }

  pub(crate) fn handle_source(&self) -> Arc<AtomicUsize> {
    self.next_handle.clone()
  }

  pub(crate) fn listeners(&self) -> &ListenerRegistry {
    &self.listeners
  }

  pub(crate) fn transports(&self) -> &TransportRegistry {
    &self.transports
  }

  pub(crate) fn stats(&self) -> &StatsRegistry {
    &self.stats
  }

  pub(crate) fn listener_wg(&self) -> &WaitGroup {
    &self.listener_wg
  }

  pub(crate) fn register_socket(&self, handle: usize, socket: &Arc<Socket>) {
    self.sockets.write().insert(handle, Arc::downgrade(socket));
    tracing::debug!(socket_id = handle, "socket registered");
  }

  pub(crate) fn unregister_socket(&self, handle: usize) {
    if self.sockets.write().remove(&handle).is_some() {
      tracing::debug!(socket_id = handle, "socket unregistered");
    }
  }

  #[cfg(feature = "inproc")]
  pub(crate) fn register_inproc(&self, name: &str, binding: InprocBinding) -> Result<(), NqError> {
    let mut registry = self.inproc_registry.write();
    if registry.contains_key(name) {
      return Err(NqError::AddrInUse(format!("inproc://{}", name)));
    }
    registry.insert(name.to_string(), binding);
    Ok(())
  }

  #[cfg(feature = "inproc")]
  pub(crate) fn unregister_inproc(&self, name: &str, binding_id: usize) {
    let mut registry = self.inproc_registry.write();
    if registry.get(name).is_some_and(|b| b.id == binding_id) {
      registry.remove(name);
    }
  }

  #[cfg(feature = "inproc")]
  pub(crate) fn lookup_inproc(&self, name: &str) -> Option<InprocBinding> {
    self.inproc_registry.read().get(name).cloned()
  }
}

/// Entry point of the runtime: creates sockets, resolves listeners by ID,
/// registers transports, and tears everything down at `term`.
///
/// Cheap to clone; all clones share the same inner state.
#[derive(Clone)]
pub struct Context {
  inner: Arc<ContextInner>,
}

impl Context {
  pub fn new() -> Self {
    tracing::debug!("nanoq context created");
    Self { inner: Arc::new(ContextInner::new()) }
  }

  pub(crate) fn inner(&self) -> &ContextInner {
    &self.inner
  }

  /// Creates a new socket.
  pub fn socket(&self) -> Result<Arc<Socket>, NqError> {
    if self.inner.shutdown_initiated.load(AtomicOrdering::Acquire) {
      return Err(NqError::Closed);
    }
    let handle = self.inner.next_handle();
    let socket = Socket::new(handle, self.clone());
    self.inner.register_socket(handle, &socket);
    Ok(socket)
  }

  /// Finds a listener by ID, adding a reference (hold semantics). Fails
  /// with `NotFound` for unknown IDs and `Closed` for closed listeners.
  pub fn listener(&self, id: u32) -> Result<Arc<Listener>, NqError> {
    self.inner.listeners.find(id)
  }

  /// Registers a transport, replacing any previous one for its scheme.
  pub fn register_transport(&self, transport: Arc<dyn Transport>) {
    self.inner.transports.register(transport);
  }

  /// Read access to the statistics tree.
  pub fn stats(&self) -> &StatsRegistry {
    &self.inner.stats
  }

  /// Terminates the runtime: closes every socket (which shuts down and
  /// dereferences its listeners), closes any listener still registered,
  /// and waits for all deferred reclamation to drain.
  pub async fn term(&self) {
    if self
      .inner
      .shutdown_initiated
      .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
      .is_err()
    {
      tracing::debug!("context term already initiated");
      return;
    }
    tracing::info!("context term initiated");

    let sockets: Vec<Arc<Socket>> = {
      let map = self.inner.sockets.read();
      map.values().filter_map(Weak::upgrade).collect()
    };
    for socket in sockets {
      socket.close().await;
    }

    // Listeners whose socket was dropped without close are still in the
    // registry; close them directly.
    for id in self.inner.listeners.ids() {
      if let Ok(listener) = self.inner.listeners.find(id) {
        listener.close().await;
      }
    }

    let wait_timeout = Duration::from_secs(10);
    match tokio::time::timeout(wait_timeout, self.inner.listener_wg.wait()).await {
      Ok(()) => tracing::info!("context term complete"),
      Err(_) => tracing::warn!(
        remaining = self.inner.listener_wg.get_count(),
        "context term timed out waiting for listener reclamation"
      ),
    }
  }
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for Context {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Context")
      .field("listeners", &self.inner.listeners.len())
      .finish()
  }
}
