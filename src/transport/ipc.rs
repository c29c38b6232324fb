// src/transport/ipc.rs

#![cfg(all(unix, feature = "ipc"))]

use crate::context::Context;
use crate::error::NqError;
use crate::options::{
  self, copyin_int, copyout_str, OptionEntry, OptionSink, OptionValue,
};
use crate::pipe::{Pipe, PipeStream};
use crate::transport::{Endpoint, Transport, TransportListener};

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

pub struct IpcTransport;

impl Transport for IpcTransport {
  fn scheme(&self) -> &'static str {
    "ipc"
  }

  fn listener(
    &self,
    endpoint: Endpoint,
    context: &Context,
  ) -> Result<Box<dyn TransportListener>, NqError> {
    let (path, uri) = match endpoint {
      Endpoint::Ipc(path, uri) => (path, uri),
      other => return Err(NqError::InvalidEndpoint(other.uri().to_string())),
    };
    Ok(Box::new(IpcListenerState {
      uri,
      path,
      handle_source: context.inner().handle_source(),
      permissions: Mutex::new(None),
      bound: Mutex::new(None),
      closed: AtomicBool::new(false),
    }))
  }
}

pub(crate) struct IpcListenerState {
  uri: String,
  path: PathBuf,
  handle_source: Arc<AtomicUsize>,
  /// Octal mode applied to the socket file at bind time.
  permissions: Mutex<Option<u32>>,
  bound: Mutex<Option<Arc<tokio::net::UnixListener>>>,
  closed: AtomicBool,
}

#[async_trait]
impl TransportListener for IpcListenerState {
  async fn bind(&self) -> Result<(), NqError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(NqError::Closed);
    }
    if self.bound.lock().is_some() {
      return Err(NqError::InvalidState("listener already bound"));
    }

    // A stale socket file from a dead process would fail the bind with
    // AddrInUse; remove it if nothing is accepting on it.
    if self.path.exists() && std::os::unix::net::UnixStream::connect(&self.path).is_err() {
      tracing::debug!(uri = %self.uri, "removing stale IPC socket file");
      let _ = std::fs::remove_file(&self.path);
    }

    let listener = tokio::net::UnixListener::bind(&self.path)
      .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    if let Some(mode) = *self.permissions.lock() {
      std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    }

    tracing::info!(uri = %self.uri, "IPC listener bound");
    *self.bound.lock() = Some(Arc::new(listener));
    Ok(())
  }

  async fn accept(&self) -> Result<Pipe, NqError> {
    let listener = {
      let bound = self.bound.lock();
      if self.closed.load(Ordering::Acquire) {
        return Err(NqError::Closed);
      }
      match bound.as_ref() {
        Some(l) => l.clone(),
        None => return Err(NqError::InvalidState("listener not bound")),
      }
    };

    let (stream, _peer) = listener
      .accept()
      .await
      .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    if self.closed.load(Ordering::Acquire) {
      return Err(NqError::Closed);
    }

    let id = self.handle_source.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(uri = %self.uri, pipe_id = id, "accepted IPC connection");
    Ok(Pipe::new(id, self.uri.clone(), PipeStream::Ipc(stream)))
  }

  fn close(&self) {
    self.closed.store(true, Ordering::Release);
    if self.bound.lock().take().is_some() {
      let _ = std::fs::remove_file(&self.path);
      tracing::debug!(uri = %self.uri, "IPC listener closed");
    }
  }

  fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
    options::table_get(IPC_OPTIONS, self, name, dst)
  }

  fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError> {
    options::table_set(IPC_OPTIONS, self, name, value)
  }
}

static IPC_OPTIONS: &[OptionEntry<IpcListenerState>] = &[
  OptionEntry {
    name: options::OPT_LOCADDR,
    get: Some(|t, dst| copyout_str(&t.path.to_string_lossy(), dst)),
    set: None,
  },
  // Permissions cannot be read back from the option layer; the file mode
  // is the kernel's once bind has happened.
  OptionEntry {
    name: options::OPT_IPC_PERMISSIONS,
    get: None,
    set: Some(|t, v| {
      let mode = copyin_int(v, 0, 0o777)? as u32;
      if t.bound.lock().is_some() {
        return Err(NqError::InvalidState("listener already bound"));
      }
      *t.permissions.lock() = Some(mode);
      Ok(())
    }),
  },
];
