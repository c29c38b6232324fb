// src/error.rs

use std::io;
use thiserror::Error;

/// Errors produced by the nanoq runtime.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NqError {
  // --- I/O Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  // --- Option Errors ---
  /// The declared type of an option value does not match the option's kind.
  #[error("Bad option type: expected {0}")]
  BadType(&'static str),
  #[error("Option is read-only")]
  ReadOnly,
  #[error("Option is write-only")]
  WriteOnly,
  #[error("Option not supported: {0}")]
  UnsupportedOption(String),

  // --- Endpoint Errors ---
  #[error("Invalid endpoint format: {0}")]
  InvalidEndpoint(String),
  #[error("Transport scheme not supported or enabled: {0}")]
  UnsupportedTransport(String),

  // --- Timeouts ---
  #[error("Operation timed out")]
  Timeout,

  // --- Connection/Binding Errors ---
  #[error("Address already in use: {0}")]
  AddrInUse(String),
  #[error("Address not available: {0}")]
  AddrNotAvailable(String),
  #[error("Connection aborted by remote peer")]
  ConnectionAborted,
  #[error("Connection closed by peer or transport")]
  ConnectionClosed,
  #[error("Connection refused by peer: {0}")]
  ConnectionRefused(String),
  #[error("Permission denied for endpoint: {0}")]
  PermissionDenied(String),
  #[error("Peer authentication failed: {0}")]
  AuthenticationFailure(String),

  // --- State Errors ---
  #[error("Operation is invalid for the current state: {0}")]
  InvalidState(&'static str),
  #[error("Object is closed")]
  Closed,
  #[error("Operation was canceled")]
  Canceled,
  #[error("Object not found")]
  NotFound,

  // --- Resource Limits ---
  #[error("Resource limit reached")]
  ResourceLimitReached,

  // --- Internal Errors ---
  #[error("Internal library error: {0}")]
  Internal(String),
}

impl NqError {
  /// Maps common `std::io::Error` kinds onto the endpoint-flavored variants.
  pub fn from_io_endpoint(e: io::Error, endpoint: &str) -> Self {
    match e.kind() {
      io::ErrorKind::AddrInUse => NqError::AddrInUse(endpoint.to_string()),
      io::ErrorKind::AddrNotAvailable => NqError::AddrNotAvailable(endpoint.to_string()),
      io::ErrorKind::ConnectionRefused => NqError::ConnectionRefused(endpoint.to_string()),
      io::ErrorKind::PermissionDenied => NqError::PermissionDenied(endpoint.to_string()),
      io::ErrorKind::TimedOut => NqError::Timeout,
      io::ErrorKind::ConnectionAborted => NqError::ConnectionAborted,
      io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => NqError::ConnectionClosed,
      _ => NqError::Io(e),
    }
  }
}
