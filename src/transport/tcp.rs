// src/transport/tcp.rs

use crate::context::Context;
use crate::error::NqError;
use crate::options::{
  self, copyin_bool, copyin_int, copyin_ms, copyin_size, copyout_bool, copyout_int, copyout_ms,
  copyout_size, copyout_sockaddr, copyout_str, ms_to_duration, DurationMs, OptionEntry, OptionSink,
  OptionValue,
};
use crate::pipe::{Pipe, PipeStream};
use crate::transport::{Endpoint, Transport, TransportListener};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use socket2::TcpKeepalive;

const DEFAULT_BACKLOG: i32 = 128;
const MAX_BACKLOG: i32 = 4096;

pub struct TcpTransport;

impl Transport for TcpTransport {
  fn scheme(&self) -> &'static str {
    "tcp"
  }

  fn listener(
    &self,
    endpoint: Endpoint,
    context: &Context,
  ) -> Result<Box<dyn TransportListener>, NqError> {
    let (addr, uri) = match endpoint {
      Endpoint::Tcp(addr, uri) => (addr, uri),
      other => return Err(NqError::InvalidEndpoint(other.uri().to_string())),
    };
    Ok(Box::new(TcpListenerState {
      uri,
      addr,
      handle_source: context.inner().handle_source(),
      config: Mutex::new(TcpConfig::default()),
      bound: Mutex::new(None),
      closed: AtomicBool::new(false),
    }))
  }
}

#[derive(Debug, Clone)]
struct TcpConfig {
  nodelay: bool,
  keepalive: bool,
  keepalive_idle: DurationMs,
  recv_max_size: usize,
  backlog: i32,
}

impl Default for TcpConfig {
  fn default() -> Self {
    Self {
      nodelay: true,
      keepalive: false,
      keepalive_idle: -1,
      recv_max_size: 0,
      backlog: DEFAULT_BACKLOG,
    }
  }
}

struct Bound {
  listener: Arc<tokio::net::TcpListener>,
  local_addr: SocketAddr,
}

pub(crate) struct TcpListenerState {
  uri: String,
  addr: String,
  handle_source: Arc<AtomicUsize>,
  config: Mutex<TcpConfig>,
  bound: Mutex<Option<Bound>>,
  closed: AtomicBool,
}

impl TcpListenerState {
  async fn resolve(&self) -> Result<SocketAddr, NqError> {
    if let Ok(addr) = self.addr.parse::<SocketAddr>() {
      return Ok(addr);
    }
    let mut addrs = tokio::net::lookup_host(self.addr.as_str())
      .await
      .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    addrs
      .next()
      .ok_or_else(|| NqError::InvalidEndpoint(self.uri.clone()))
  }

  fn apply_stream_options(&self, stream: &tokio::net::TcpStream) -> Result<(), NqError> {
    let config = self.config.lock().clone();
    stream.set_nodelay(config.nodelay)?;
    if config.keepalive {
      let sock_ref = socket2::SockRef::from(stream);
      let mut keepalive = TcpKeepalive::new();
      if let Some(idle) = ms_to_duration(config.keepalive_idle) {
        keepalive = keepalive.with_time(idle);
      }
      sock_ref.set_tcp_keepalive(&keepalive)?;
    }
    Ok(())
  }

  fn local_addr(&self) -> Result<SocketAddr, NqError> {
    self
      .bound
      .lock()
      .as_ref()
      .map(|b| b.local_addr)
      .ok_or(NqError::InvalidState("listener not bound"))
  }
}

#[async_trait]
impl TransportListener for TcpListenerState {
  async fn bind(&self) -> Result<(), NqError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(NqError::Closed);
    }
    if self.bound.lock().is_some() {
      return Err(NqError::InvalidState("listener already bound"));
    }

    let addr = self.resolve().await?;
    let backlog = self.config.lock().backlog;

    let domain = if addr.is_ipv4() {
      socket2::Domain::IPV4
    } else {
      socket2::Domain::IPV6
    };
    let socket = socket2::Socket::new(domain, socket2::Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket
      .bind(&addr.into())
      .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    socket.listen(backlog)?;
    let local_addr = socket
      .local_addr()?
      .as_socket()
      .ok_or_else(|| NqError::Internal("bound address is not an inet address".into()))?;

    let std_listener: std::net::TcpListener = socket.into();
    std_listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;

    tracing::info!(uri = %self.uri, local_addr = %local_addr, "TCP listener bound");
    *self.bound.lock() = Some(Bound { listener: Arc::new(listener), local_addr });
    Ok(())
  }

  async fn accept(&self) -> Result<Pipe, NqError> {
    let listener = {
      let bound = self.bound.lock();
      if self.closed.load(Ordering::Acquire) {
        return Err(NqError::Closed);
      }
      match bound.as_ref() {
        Some(b) => b.listener.clone(),
        None => return Err(NqError::InvalidState("listener not bound")),
      }
    };

    let (stream, peer_addr) = listener
      .accept()
      .await
      .map_err(|e| NqError::from_io_endpoint(e, &self.uri))?;
    if self.closed.load(Ordering::Acquire) {
      return Err(NqError::Closed);
    }
    self.apply_stream_options(&stream)?;

    let id = self.handle_source.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(uri = %self.uri, peer = %peer_addr, pipe_id = id, "accepted TCP connection");
    Ok(Pipe::new(id, format!("tcp://{}", peer_addr), PipeStream::Tcp(stream)))
  }

  fn close(&self) {
    self.closed.store(true, Ordering::Release);
    let bound = self.bound.lock().take();
    if bound.is_some() {
      tracing::debug!(uri = %self.uri, "TCP listener closed");
    }
  }

  fn get_option(&self, name: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
    options::table_get(TCP_OPTIONS, self, name, dst)
  }

  fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), NqError> {
    options::table_set(TCP_OPTIONS, self, name, value)
  }
}

// URL is overridden here so wildcard binds report the resolved address.
static TCP_OPTIONS: &[OptionEntry<TcpListenerState>] = &[
  OptionEntry {
    name: options::OPT_URL,
    get: Some(|t, dst| {
      let url = match t.bound.lock().as_ref() {
        Some(b) => format!("tcp://{}", b.local_addr),
        None => t.uri.clone(),
      };
      copyout_str(&url, dst)
    }),
    set: None,
  },
  OptionEntry {
    name: options::OPT_LOCADDR,
    get: Some(|t, dst| copyout_sockaddr(&t.local_addr()?, dst)),
    set: None,
  },
  OptionEntry {
    name: options::OPT_TCP_BOUND_PORT,
    get: Some(|t, dst| copyout_int(t.local_addr()?.port() as i32, dst)),
    set: None,
  },
  OptionEntry {
    name: options::OPT_RECVMAXSZ,
    get: Some(|t, dst| copyout_size(t.config.lock().recv_max_size, dst)),
    set: Some(|t, v| {
      let size = copyin_size(v, 0, usize::MAX)?;
      t.config.lock().recv_max_size = size;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_TCP_NODELAY,
    get: Some(|t, dst| copyout_bool(t.config.lock().nodelay, dst)),
    set: Some(|t, v| {
      t.config.lock().nodelay = copyin_bool(v)?;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_TCP_KEEPALIVE,
    get: Some(|t, dst| copyout_bool(t.config.lock().keepalive, dst)),
    set: Some(|t, v| {
      t.config.lock().keepalive = copyin_bool(v)?;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_TCP_KEEPALIVE_IDLE,
    get: Some(|t, dst| copyout_ms(t.config.lock().keepalive_idle, dst)),
    set: Some(|t, v| {
      t.config.lock().keepalive_idle = copyin_ms(v)?;
      Ok(())
    }),
  },
  OptionEntry {
    name: options::OPT_TCP_BACKLOG,
    get: Some(|t, dst| copyout_int(t.config.lock().backlog, dst)),
    set: Some(|t, v| {
      let backlog = copyin_int(v, 1, MAX_BACKLOG)?;
      if t.bound.lock().is_some() {
        return Err(NqError::InvalidState("listener already bound"));
      }
      t.config.lock().backlog = backlog;
      Ok(())
    }),
  },
];
