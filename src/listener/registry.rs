// src/listener/registry.rs

use crate::error::NqError;
use crate::listener::Listener;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;

/// Listener IDs live in [ID_MIN, ID_MAX], i.e. [1, 0x7fffffff).
pub(crate) const ID_MIN: u32 = 1;
pub(crate) const ID_MAX: u32 = 0x7fff_fffe;

/// The ID table mapping listener IDs to live handles.
///
/// One mutex serializes every operation; each critical section is an O(1)
/// map operation plus flag reads. No transport or user callback ever runs
/// under this lock, and evicted handles are always dropped after it is
/// released.
pub(crate) struct ListenerRegistry {
  inner: Mutex<Inner>,
}

struct Inner {
  map: HashMap<u32, Arc<Listener>>,
  next_id: u32,
}

impl ListenerRegistry {
  pub(crate) fn new() -> Self {
    // Rotating allocation from a random starting point keeps freshly
    // started processes from handing out the same small IDs and avoids
    // short-term reuse after removal.
    let next_id = rand::rng().random_range(ID_MIN..=ID_MAX);
    Self {
      inner: Mutex::new(Inner { map: HashMap::new(), next_id }),
    }
  }

  /// Allocates the next free ID and records the mapping.
  pub(crate) fn register(&self, listener: &Arc<Listener>) -> Result<u32, NqError> {
    let mut inner = self.inner.lock();
    if inner.map.len() as u64 >= (ID_MAX - ID_MIN + 1) as u64 {
      return Err(NqError::ResourceLimitReached);
    }
    loop {
      let id = inner.next_id;
      inner.next_id = if id >= ID_MAX { ID_MIN } else { id + 1 };
      if !inner.map.contains_key(&id) {
        inner.map.insert(id, listener.clone());
        return Ok(id);
      }
    }
  }

  /// Returns the listener with an added reference, unless it is closed.
  pub(crate) fn find(&self, id: u32) -> Result<Arc<Listener>, NqError> {
    let inner = self.inner.lock();
    match inner.map.get(&id) {
      None => Err(NqError::NotFound),
      Some(l) if l.is_closed() => Err(NqError::Closed),
      Some(l) => Ok(l.clone()),
    }
  }

  /// Adds a reference to an already-held listener, unless it is closed.
  pub(crate) fn hold(&self, listener: &Arc<Listener>) -> Result<Arc<Listener>, NqError> {
    let _guard = self.inner.lock();
    if listener.is_closed() {
      Err(NqError::Closed)
    } else {
      Ok(listener.clone())
    }
  }

  /// Marks the listener closed. Returns true only for the first close;
  /// the flag transition is arbitrated under the registry lock.
  pub(crate) fn mark_closed(&self, listener: &Listener) -> bool {
    let _guard = self.inner.lock();
    if listener.is_closed() {
      false
    } else {
      listener.set_closed();
      true
    }
  }

  /// Unregisters an ID without touching other references.
  pub(crate) fn remove(&self, id: u32) {
    let evicted = { self.inner.lock().map.remove(&id) };
    // Dropped here, outside the lock: this may be the last reference, and
    // reclamation must never run under the registry lock.
    drop(evicted);
  }

  pub(crate) fn ids(&self) -> Vec<u32> {
    self.inner.lock().map.keys().copied().collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.inner.lock().map.len()
  }
}
