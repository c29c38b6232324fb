// src/pipe.rs

//! Accepted connections, as handed from a listener to its socket.

use crate::listener::ListenerStats;

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// The transport-level byte stream underneath a pipe.
#[derive(Debug)]
pub enum PipeStream {
  Tcp(tokio::net::TcpStream),
  #[cfg(all(unix, feature = "ipc"))]
  Ipc(tokio::net::UnixStream),
  /// In-process stream; also the carrier used by simulated transports.
  #[cfg(feature = "inproc")]
  Inproc(tokio::io::DuplexStream),
}

/// An established connection delivered by a listener to its owning socket.
///
/// A pipe created by a listener keeps a handle to that listener's
/// statistics so the open-pipe gauge tracks it until drop. The pipe itself
/// is the byte stream: it implements `AsyncRead` and `AsyncWrite`.
#[derive(Debug)]
pub struct Pipe {
  id: usize,
  uri: String,
  stream: PipeStream,
  listener_stats: Option<Arc<ListenerStats>>,
}

impl Pipe {
  pub fn new(id: usize, uri: impl Into<String>, stream: PipeStream) -> Self {
    Self { id, uri: uri.into(), stream, listener_stats: None }
  }

  /// Process-unique pipe id.
  pub fn id(&self) -> usize {
    self.id
  }

  /// Connection URI (peer address for TCP, path for IPC, name for inproc).
  pub fn uri(&self) -> &str {
    &self.uri
  }

  pub(crate) fn attach_listener_stats(&mut self, stats: Arc<ListenerStats>) {
    stats.npipes.inc();
    self.listener_stats = Some(stats);
  }
}

impl Drop for Pipe {
  fn drop(&mut self) {
    if let Some(stats) = self.listener_stats.take() {
      stats.npipes.dec();
    }
  }
}

impl AsyncRead for Pipe {
  fn poll_read(
    mut self: Pin<&mut Self>,
    cx: &mut TaskContext<'_>,
    buf: &mut ReadBuf<'_>,
  ) -> Poll<io::Result<()>> {
    match &mut self.stream {
      PipeStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
      #[cfg(all(unix, feature = "ipc"))]
      PipeStream::Ipc(s) => Pin::new(s).poll_read(cx, buf),
      #[cfg(feature = "inproc")]
      PipeStream::Inproc(s) => Pin::new(s).poll_read(cx, buf),
    }
  }
}

impl AsyncWrite for Pipe {
  fn poll_write(
    mut self: Pin<&mut Self>,
    cx: &mut TaskContext<'_>,
    buf: &[u8],
  ) -> Poll<io::Result<usize>> {
    match &mut self.stream {
      PipeStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
      #[cfg(all(unix, feature = "ipc"))]
      PipeStream::Ipc(s) => Pin::new(s).poll_write(cx, buf),
      #[cfg(feature = "inproc")]
      PipeStream::Inproc(s) => Pin::new(s).poll_write(cx, buf),
    }
  }

  fn poll_flush(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
    match &mut self.stream {
      PipeStream::Tcp(s) => Pin::new(s).poll_flush(cx),
      #[cfg(all(unix, feature = "ipc"))]
      PipeStream::Ipc(s) => Pin::new(s).poll_flush(cx),
      #[cfg(feature = "inproc")]
      PipeStream::Inproc(s) => Pin::new(s).poll_flush(cx),
    }
  }

  fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
    match &mut self.stream {
      PipeStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
      #[cfg(all(unix, feature = "ipc"))]
      PipeStream::Ipc(s) => Pin::new(s).poll_shutdown(cx),
      #[cfg(feature = "inproc")]
      PipeStream::Inproc(s) => Pin::new(s).poll_shutdown(cx),
    }
  }
}
