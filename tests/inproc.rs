// tests/inproc.rs

//! In-process transport: rendezvous, accept, and name lifecycle.

use nanoq::{connect_inproc, NqError};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;

#[tokio::test]
async fn inproc_connect_accept_round_trip() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();

  let listener = socket.listen("inproc://rendezvous").await.unwrap();
  let id = listener.id();

  let mut client = connect_inproc(&ctx, "rendezvous").await.unwrap();
  let mut pipe = common::accept_timeout(&socket, common::LONG_TIMEOUT).await;
  assert_eq!(pipe.uri(), "inproc://rendezvous");

  client.write_all(b"hello").await.unwrap();
  let mut buf = [0u8; 5];
  pipe.read_exact(&mut buf).await.unwrap();
  assert_eq!(&buf, b"hello");

  let scope = ctx.stats().scope(&format!("listener{}", id)).unwrap();
  assert_eq!(scope.value("accept"), Some(1));

  listener.close().await;
  ctx.term().await;
}

#[tokio::test]
async fn duplicate_inproc_name_is_addr_in_use() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();

  let listener = socket.listen("inproc://unique-name").await.unwrap();
  assert!(matches!(
    socket.listen("inproc://unique-name").await,
    Err(NqError::AddrInUse(_))
  ));

  // The name frees up once the holder closes.
  listener.close().await;
  let listener = socket.listen("inproc://unique-name").await.unwrap();
  listener.close().await;

  ctx.term().await;
}

#[tokio::test]
async fn connect_without_binder_is_refused() {
  let ctx = common::test_context();

  assert!(matches!(
    connect_inproc(&ctx, "nobody-home").await,
    Err(NqError::ConnectionRefused(_))
  ));

  ctx.term().await;
}

#[tokio::test]
async fn close_rejects_pending_connectors() {
  let ctx = common::test_context();
  let socket = ctx.socket().unwrap();

  let listener = socket.listen("inproc://short-lived").await.unwrap();
  listener.close().await;

  assert!(matches!(
    connect_inproc(&ctx, "short-lived").await,
    Err(NqError::ConnectionRefused(_))
  ));

  ctx.term().await;
}
