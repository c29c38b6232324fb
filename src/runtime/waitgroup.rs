// src/runtime/waitgroup.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// An asynchronous WaitGroup, similar to Go's `sync.WaitGroup`.
///
/// The context registers every live listener with the group (`add`) and
/// each listener signals on reclamation (`done`, callable from `Drop`).
/// `Context::term` waits until the count returns to zero, which is what
/// drains deferred reclamation before the registries are torn down.
#[derive(Debug, Clone)]
pub(crate) struct WaitGroup {
  count: Arc<AtomicUsize>,
  notify_on_zero: Arc<Notify>,
}

impl WaitGroup {
  pub fn new() -> Self {
    Self {
      count: Arc::new(AtomicUsize::new(0)),
      notify_on_zero: Arc::new(Notify::new()),
    }
  }

  pub fn add(&self, delta: usize) {
    if delta == 0 {
      return;
    }
    self.count.fetch_add(delta, Ordering::Relaxed);
  }

  /// Decrements the counter by one, waking waiters when it reaches zero.
  ///
  /// Synchronous so it can be called from `Drop` implementations.
  pub fn done(&self) {
    let old_count = self.count.fetch_sub(1, Ordering::AcqRel);
    if old_count == 0 {
      self.count.fetch_add(1, Ordering::Relaxed);
      panic!("WaitGroup::done() called when count was already zero");
    } else if old_count == 1 {
      self.notify_on_zero.notify_waiters();
      tracing::trace!("WaitGroup count reached zero, notifying waiters");
    }
  }

  /// Waits asynchronously until the counter becomes zero.
  pub async fn wait(&self) {
    if self.count.load(Ordering::Acquire) == 0 {
      return;
    }
    loop {
      self.notify_on_zero.notified().await;
      if self.count.load(Ordering::Acquire) == 0 {
        return;
      }
    }
  }

  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Relaxed)
  }
}
