// src/stats.rs

//! Hierarchical runtime statistics.
//!
//! Statistics form a tree of scopes; each scope carries named items
//! (atomic counters, fixed ids, strings) and child scopes. Listeners
//! publish a `listener{id}` scope under the root, and protocol layers may
//! append further items to it. Rendering/export is out of scope; the tree
//! is exposed for snapshot-style lookups.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically adjusted atomic counter.
#[derive(Debug, Default)]
pub struct StatCounter(AtomicU64);

impl StatCounter {
  pub fn inc(&self) {
    self.0.fetch_add(1, Ordering::Relaxed);
  }

  pub fn add(&self, n: u64) {
    self.0.fetch_add(n, Ordering::Relaxed);
  }

  /// Saturating decrement; used for gauges such as open-pipe counts.
  pub fn dec(&self) {
    let _ = self
      .0
      .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
  }

  pub fn get(&self) -> u64 {
    self.0.load(Ordering::Relaxed)
  }
}

#[derive(Debug)]
pub enum StatValue {
  Counter(Arc<StatCounter>),
  Id(u64),
  Str(String),
}

#[derive(Debug)]
pub struct StatItem {
  pub name: String,
  pub desc: &'static str,
  pub value: StatValue,
}

impl StatItem {
  pub fn counter(name: impl Into<String>, desc: &'static str, counter: Arc<StatCounter>) -> Self {
    Self { name: name.into(), desc, value: StatValue::Counter(counter) }
  }

  pub fn id(name: impl Into<String>, desc: &'static str, id: u64) -> Self {
    Self { name: name.into(), desc, value: StatValue::Id(id) }
  }

  pub fn string(name: impl Into<String>, desc: &'static str, s: impl Into<String>) -> Self {
    Self { name: name.into(), desc, value: StatValue::Str(s.into()) }
  }
}

/// A named node in the statistics tree.
#[derive(Debug)]
pub struct StatScope {
  name: String,
  desc: &'static str,
  items: Mutex<Vec<StatItem>>,
  children: Mutex<Vec<Arc<StatScope>>>,
}

impl StatScope {
  pub fn new(name: impl Into<String>, desc: &'static str) -> Arc<Self> {
    Arc::new(Self {
      name: name.into(),
      desc,
      items: Mutex::new(Vec::new()),
      children: Mutex::new(Vec::new()),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn desc(&self) -> &'static str {
    self.desc
  }

  pub fn append_item(&self, item: StatItem) {
    self.items.lock().push(item);
  }

  pub fn append_child(&self, child: Arc<StatScope>) {
    self.children.lock().push(child);
  }

  pub fn child(&self, name: &str) -> Option<Arc<StatScope>> {
    self.children.lock().iter().find(|c| c.name == name).cloned()
  }

  fn remove_child(&self, child: &Arc<StatScope>) -> bool {
    let mut children = self.children.lock();
    let before = children.len();
    children.retain(|c| !Arc::ptr_eq(c, child));
    children.len() != before
  }

  /// Snapshot value of a counter or id item.
  pub fn value(&self, name: &str) -> Option<u64> {
    let items = self.items.lock();
    items.iter().find(|i| i.name == name).and_then(|i| match &i.value {
      StatValue::Counter(c) => Some(c.get()),
      StatValue::Id(id) => Some(*id),
      StatValue::Str(_) => None,
    })
  }

  pub fn string_value(&self, name: &str) -> Option<String> {
    let items = self.items.lock();
    items.iter().find(|i| i.name == name).and_then(|i| match &i.value {
      StatValue::Str(s) => Some(s.clone()),
      _ => None,
    })
  }

  pub fn item_names(&self) -> Vec<String> {
    self.items.lock().iter().map(|i| i.name.clone()).collect()
  }
}

/// Root of the statistics tree, owned by the context.
#[derive(Debug)]
pub struct StatsRegistry {
  root: Arc<StatScope>,
}

impl StatsRegistry {
  pub(crate) fn new() -> Self {
    Self { root: StatScope::new("", "statistics root") }
  }

  pub fn root(&self) -> &Arc<StatScope> {
    &self.root
  }

  /// Appends `scope` under the root.
  pub fn register(&self, scope: Arc<StatScope>) {
    tracing::trace!(scope = %scope.name(), "registering stats scope");
    self.root.append_child(scope);
  }

  /// Removes `scope` from the root. A scope that was never registered is
  /// ignored, so teardown paths can call this unconditionally.
  pub fn deregister(&self, scope: &Arc<StatScope>) {
    if self.root.remove_child(scope) {
      tracing::trace!(scope = %scope.name(), "removed stats scope");
    }
  }

  pub fn scope(&self, name: &str) -> Option<Arc<StatScope>> {
    self.root.child(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counter_inc_dec() {
    let c = StatCounter::default();
    c.inc();
    c.inc();
    c.dec();
    assert_eq!(c.get(), 1);
    c.dec();
    c.dec(); // saturates at zero
    assert_eq!(c.get(), 0);
  }

  #[test]
  fn scope_registration_and_lookup() {
    let reg = StatsRegistry::new();
    let scope = StatScope::new("listener7", "listener statistics");
    let accepts = Arc::new(StatCounter::default());
    scope.append_item(StatItem::id("id", "listener id", 7));
    scope.append_item(StatItem::string("url", "listener url", "tcp://127.0.0.1:0"));
    scope.append_item(StatItem::counter("accept", "connections accepted", accepts.clone()));
    reg.register(scope.clone());

    accepts.inc();
    let found = reg.scope("listener7").unwrap();
    assert_eq!(found.value("id"), Some(7));
    assert_eq!(found.value("accept"), Some(1));
    assert_eq!(found.string_value("url").as_deref(), Some("tcp://127.0.0.1:0"));

    reg.deregister(&scope);
    assert!(reg.scope("listener7").is_none());
    // Double deregistration is a no-op.
    reg.deregister(&scope);
  }
}
