// src/socket/core.rs

use crate::context::Context;
use crate::error::NqError;
use crate::listener::Listener;
use crate::options::{
  self, copyin_int, copyin_size, copyin_str, copyout_bool, copyout_size, copyout_str, OptionEntry,
  OptionSink, OptionValue,
};
use crate::pipe::Pipe;
use crate::socket::options::{SocketOptions, MAX_PIPE_BACKLOG, SOCKNAME_MAXLEN};

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

/// Why a delivered pipe was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeReject {
  /// The owning layer refused the pipe (socket closed or closing).
  Protocol,
  /// The application is not keeping up; the accepted-pipe queue is full.
  Application,
}

#[derive(Debug)]
struct SocketState {
  closed: bool,
  listeners: Vec<Arc<Listener>>,
  options: SocketOptions,
}

/// A socket: owner of listeners, consumer of accepted pipes.
///
/// This is deliberately minimal: no protocol semantics, no message
/// framing. It owns listeners, takes delivery of the pipes their accept
/// loops produce, and serves as the fallback for option reads that no
/// transport claims.
#[derive(Debug)]
pub struct Socket {
  handle: usize,
  context: Context,
  state: RwLock<SocketState>,
  pipes: Mutex<VecDeque<Pipe>>,
  pipe_available: Notify,
}

impl Socket {
  pub(crate) fn new(handle: usize, context: Context) -> Arc<Self> {
    let options = SocketOptions {
      name: format!("socket{}", handle),
      ..SocketOptions::default()
    };
    Arc::new(Self {
      handle,
      context,
      state: RwLock::new(SocketState { closed: false, listeners: Vec::new(), options }),
      pipes: Mutex::new(VecDeque::new()),
      pipe_available: Notify::new(),
    })
  }

  /// Process-unique socket ID.
  pub fn id(&self) -> usize {
    self.handle
  }

  /// Creates a listener for `url` without starting it.
  pub fn new_listener(self: &Arc<Self>, url: &str) -> Result<Arc<Listener>, NqError> {
    Listener::create(&self.context, self, url)
  }

  /// Creates and starts a listener for `url`. A listener that fails to
  /// start is fully closed before the error propagates.
  pub async fn listen(self: &Arc<Self>, url: &str) -> Result<Arc<Listener>, NqError> {
    let listener = Listener::create(&self.context, self, url)?;
    match listener.start().await {
      Ok(()) => Ok(listener),
      Err(e) => {
        listener.close().await;
        Err(e)
      }
    }
  }

  pub(crate) fn add_listener(&self, listener: Arc<Listener>) -> Result<(), NqError> {
    let mut state = self.state.write();
    if state.closed {
      return Err(NqError::Closed);
    }
    state.listeners.push(listener);
    Ok(())
  }

  pub(crate) fn remove_listener(&self, id: u32) {
    // Evicted handles drop after the lock is released.
    let _evicted: Vec<Arc<Listener>>;
    {
      let mut state = self.state.write();
      let (gone, kept) = state.listeners.drain(..).partition(|l| l.id() == id);
      state.listeners = kept;
      _evicted = gone;
    }
  }

  /// Takes delivery of a pipe produced by one of this socket's listeners.
  pub(crate) fn deliver_pipe(&self, pipe: Pipe) -> Result<(), PipeReject> {
    let backlog = {
      let state = self.state.read();
      if state.closed {
        return Err(PipeReject::Protocol);
      }
      state.options.pipe_backlog
    };

    {
      let mut pipes = self.pipes.lock();
      if pipes.len() >= backlog {
        tracing::warn!(socket_id = self.handle, backlog, "accepted-pipe queue full; rejecting pipe");
        return Err(PipeReject::Application);
      }
      pipes.push_back(pipe);
    }
    self.pipe_available.notify_one();
    Ok(())
  }

  /// Waits for the next accepted pipe.
  pub async fn accept(&self) -> Result<Pipe, NqError> {
    loop {
      let notified = self.pipe_available.notified();
      {
        if self.state.read().closed {
          return Err(NqError::Closed);
        }
        if let Some(pipe) = self.pipes.lock().pop_front() {
          return Ok(pipe);
        }
      }
      notified.await;
    }
  }

  pub fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
    options::table_get(SOCKET_OPTIONS, self, name, dst)
  }

  pub fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError> {
    options::table_set(SOCKET_OPTIONS, self, name, value)
  }

  /// Closes the socket: shuts down and dereferences every listener, then
  /// drains queued pipes. Idempotent.
  pub async fn close(&self) {
    let listeners = {
      let mut state = self.state.write();
      if state.closed {
        return;
      }
      state.closed = true;
      std::mem::take(&mut state.listeners)
    };
    self.pipe_available.notify_waiters();

    tracing::debug!(socket_id = self.handle, listeners = listeners.len(), "socket closing");
    // Shutdown is driven here, so each listener only needs the
    // bookkeeping variant of close afterwards.
    futures::future::join_all(listeners.iter().map(|l| l.shutdown())).await;
    for listener in listeners {
      listener.close_after_shutdown();
    }

    self.pipes.lock().clear();
    self.context.inner().unregister_socket(self.handle);
    tracing::debug!(socket_id = self.handle, "socket closed");
  }
}

static SOCKET_OPTIONS: &[OptionEntry<Socket>] = &[
  OptionEntry {
    name: options::OPT_SOCKNAME,
    get: Some(|s, dst| copyout_str(&s.state.read().options.name, dst)),
    set: Some(|s, v| {
      let name = copyin_str(v, SOCKNAME_MAXLEN)?;
      s.state.write().options.name = name;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_RAW,
    get: Some(|s, dst| copyout_bool(s.state.read().options.raw, dst)),
    set: None,
  },
  OptionEntry {
    name: options::OPT_RECVMAXSZ,
    get: Some(|s, dst| copyout_size(s.state.read().options.recv_max_size, dst)),
    set: Some(|s, v| {
      let size = copyin_size(v, 0, usize::MAX)?;
      s.state.write().options.recv_max_size = size;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_PIPE_BACKLOG,
    get: Some(|s, dst| {
      let backlog = s.state.read().options.pipe_backlog;
      options::copyout_int(backlog as i32, dst)
    }),
    set: Some(|s, v| {
      let backlog = copyin_int(v, 1, MAX_PIPE_BACKLOG)?;
      s.state.write().options.pipe_backlog = backlog as usize;
      Ok(())
    }),
  },
];
