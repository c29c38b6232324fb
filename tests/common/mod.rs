// tests/common/mod.rs

#![allow(dead_code)]

use nanoq::Context;

use std::sync::Once;
use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(250);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(2);

static TRACING_INIT: Once = Once::new();

/// Creates a context with test logging installed.
pub fn test_context() -> Context {
  TRACING_INIT.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  });
  Context::new()
}

/// Awaits the next accepted pipe, failing the test on timeout.
pub async fn accept_timeout(
  socket: &std::sync::Arc<nanoq::Socket>,
  timeout: Duration,
) -> nanoq::Pipe {
  tokio::time::timeout(timeout, socket.accept())
    .await
    .expect("timed out waiting for accepted pipe")
    .expect("socket accept failed")
}
