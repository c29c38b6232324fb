// src/listener/accept.rs

//! The accept state machine.
//!
//! One task per started listener drives the transport's accept operation in
//! a loop. At most one accept (or one cooldown wait) is outstanding at a
//! time. Errors are classified into transient (retry immediately), terminal
//! (stop), and unclassified (retry after a fixed cooldown); none of them is
//! surfaced to callers; outcomes are only observable through the
//! listener's statistics.

use crate::error::NqError;
use crate::listener::Listener;
use crate::transport::TransportListener;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cooldown before retrying after an unclassified accept failure. These
/// are typically resource-exhaustion conditions; retrying in a tight loop
/// would only make them worse.
pub(crate) const ACCEPT_COOLDOWN: Duration = Duration::from_millis(100);

pub(crate) async fn accept_loop(listener: Arc<Listener>, cancel: CancellationToken) {
  let listener_id = listener.id();
  tracing::debug!(listener_id, uri = %listener.uri(), "accept loop started");

  loop {
    let result = tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(NqError::Canceled),
      r = listener.transport().accept() => r,
    };

    let stats = listener.stats();
    match result {
      Ok(pipe) => {
        stats.accept.inc();
        listener.forward_pipe(pipe);
      }
      // Remote conditions; the peer gave up mid-handshake. Retry at once.
      Err(NqError::ConnectionAborted) | Err(NqError::ConnectionClosed) => {
        stats.aborted.inc();
      }
      // The timeout itself already consumed the wait.
      Err(NqError::Timeout) => {
        stats.timedout.inc();
      }
      Err(NqError::AuthenticationFailure(reason)) => {
        tracing::debug!(listener_id, %reason, "peer failed authentication");
        stats.othererr.inc();
      }
      Err(NqError::Closed) | Err(NqError::Canceled) => {
        stats.canceled.inc();
        break;
      }
      Err(e) => {
        stats.othererr.inc();
        tracing::debug!(listener_id, error = %e, "unclassified accept failure, cooling down");
        // A canceled cooldown issues no further accept.
        tokio::select! {
          biased;
          _ = cancel.cancelled() => break,
          _ = tokio::time::sleep(ACCEPT_COOLDOWN) => {}
        }
      }
    }
  }

  tracing::debug!(listener_id, uri = %listener.uri(), "accept loop stopped");
}
