// tests/tcp.rs

//! End-to-end accept path over real TCP sockets.

use nanoq::options::{OPT_LOCADDR, OPT_PIPE_BACKLOG, OPT_URL};
use nanoq::{NqError, OptionSink, OptionValue};

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;

async fn resolved_url(listener: &nanoq::Listener) -> String {
  let mut url = String::new();
  listener.get_option(OPT_URL, &mut OptionSink::Str(&mut url)).unwrap();
  url
}

#[tokio::test]
async fn accepts_and_forwards_pipes() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();
  let listener = socket.listen("tcp://127.0.0.1:0").await.unwrap();
  let id = listener.id();

  let url = resolved_url(&listener).await;
  let addr = url.strip_prefix("tcp://").unwrap();

  let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
  let mut pipe = common::accept_timeout(&socket, common::LONG_TIMEOUT).await;

  // The pipe is a live byte stream.
  client.write_all(b"ping").await.unwrap();
  let mut buf = [0u8; 4];
  pipe.read_exact(&mut buf).await.unwrap();
  assert_eq!(&buf, b"ping");
  pipe.write_all(b"pong").await.unwrap();
  let mut echo = [0u8; 4];
  client.read_exact(&mut echo).await.unwrap();
  assert_eq!(&echo, b"pong");

  let scope = ctx.stats().scope(&format!("listener{}", id)).unwrap();
  assert_eq!(scope.value("accept"), Some(1));
  assert_eq!(scope.value("npipes"), Some(1));
  assert_eq!(scope.string_value("url").as_deref(), Some("tcp://127.0.0.1:0"));
  assert_eq!(scope.value("socket"), Some(socket.id() as u64));

  // Protocol layers may attach their own counters to the subtree.
  let handshakes = std::sync::Arc::new(nanoq::StatCounter::default());
  listener.add_stat(nanoq::StatItem::counter(
    "handshakes",
    "completed protocol handshakes",
    handshakes.clone(),
  ));
  handshakes.inc();
  assert_eq!(scope.value("handshakes"), Some(1));

  // Dropping the pipe moves the open-pipe gauge back down.
  drop(pipe);
  assert_eq!(scope.value("npipes"), Some(0));

  listener.close().await;
  ctx.term().await;
}

#[tokio::test]
async fn local_address_option_reports_bound_addr() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();
  let listener = socket.listen("tcp://127.0.0.1:0").await.unwrap();

  let mut addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
  listener
    .get_option(OPT_LOCADDR, &mut OptionSink::SockAddr(&mut addr))
    .unwrap();
  assert_eq!(addr.ip().to_string(), "127.0.0.1");
  assert_ne!(addr.port(), 0);

  listener.close().await;
  ctx.term().await;
}

#[tokio::test]
async fn backlog_overflow_counts_application_rejects() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();
  socket
    .set_option(OPT_PIPE_BACKLOG, &OptionValue::Int(1))
    .unwrap();

  let listener = socket.listen("tcp://127.0.0.1:0").await.unwrap();
  let id = listener.id();
  let url = resolved_url(&listener).await;
  let addr = url.strip_prefix("tcp://").unwrap().to_string();

  // Nobody drains the socket queue, so only the first connection fits.
  let mut clients = Vec::new();
  for _ in 0..3 {
    clients.push(tokio::net::TcpStream::connect(addr.as_str()).await.unwrap());
  }

  let scope = ctx.stats().scope(&format!("listener{}", id)).unwrap();
  let deadline = tokio::time::Instant::now() + common::LONG_TIMEOUT;
  while scope.value("appreject") != Some(2) && tokio::time::Instant::now() < deadline {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  assert_eq!(scope.value("accept"), Some(3));
  assert_eq!(scope.value("appreject"), Some(2));
  assert_eq!(scope.value("npipes"), Some(1));

  listener.close().await;
  ctx.term().await;
}

#[tokio::test]
async fn delivery_to_closed_socket_counts_protocol_rejects() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();

  let listener = socket.listen("tcp://127.0.0.1:0").await.unwrap();
  let id = listener.id();
  let url = resolved_url(&listener).await;
  let addr = url.strip_prefix("tcp://").unwrap().to_string();

  // Keep the listener alive past the socket close so the accept loop can
  // still take one connection and have its delivery refused.
  let held = ctx.listener(id).unwrap();
  let scope = ctx.stats().scope(&format!("listener{}", id)).unwrap();

  // Closing the socket shuts the listener down; a connection racing the
  // close is either accepted-and-refused or never accepted at all.
  let connect = tokio::net::TcpStream::connect(addr.as_str());
  let (conn, ()) = tokio::join!(connect, socket.close());
  drop(conn);

  tokio::time::sleep(Duration::from_millis(50)).await;
  let protoreject = scope.value("protoreject").unwrap();
  let accepted = scope.value("accept").unwrap();
  assert!(protoreject <= accepted);
  assert_eq!(scope.value("npipes"), Some(0));

  drop(held);
  ctx.term().await;
}

#[tokio::test]
async fn listen_on_taken_port_fails_cleanly() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();

  let first = socket.listen("tcp://127.0.0.1:0").await.unwrap();
  let url = resolved_url(&first).await;

  // `listen` closes the half-constructed listener before propagating the
  // bind failure; nothing stays registered.
  let registered_before = ctx.stats().root().child(&format!("listener{}", first.id())).is_some();
  assert!(registered_before);
  match socket.listen(&url).await {
    Err(NqError::AddrInUse(_)) => {}
    other => panic!("expected AddrInUse, got {:?}", other.map(|l| l.id())),
  }

  first.close().await;
  ctx.term().await;
}
