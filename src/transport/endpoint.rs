// src/transport/endpoint.rs

use crate::error::NqError;

#[cfg(all(unix, feature = "ipc"))]
use std::path::PathBuf;

/// A parsed and validated endpoint address.
///
/// Unknown-but-well-formed schemes parse to `Custom` so that externally
/// registered transports resolve through the same lookup path as the
/// built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
  /// Address part (e.g. "127.0.0.1:5555") and the original URI.
  Tcp(String, String),
  #[cfg(all(unix, feature = "ipc"))]
  /// Validated socket path and the original URI.
  Ipc(PathBuf, String),
  #[cfg(feature = "inproc")]
  /// Rendezvous name and the original URI.
  Inproc(String, String),
  Custom {
    scheme: String,
    address: String,
    uri: String,
  },
}

impl Endpoint {
  pub fn scheme(&self) -> &str {
    match self {
      Endpoint::Tcp(..) => "tcp",
      #[cfg(all(unix, feature = "ipc"))]
      Endpoint::Ipc(..) => "ipc",
      #[cfg(feature = "inproc")]
      Endpoint::Inproc(..) => "inproc",
      Endpoint::Custom { scheme, .. } => scheme,
    }
  }

  /// The original URI string the endpoint was parsed from.
  pub fn uri(&self) -> &str {
    match self {
      Endpoint::Tcp(_, uri) => uri,
      #[cfg(all(unix, feature = "ipc"))]
      Endpoint::Ipc(_, uri) => uri,
      #[cfg(feature = "inproc")]
      Endpoint::Inproc(_, uri) => uri,
      Endpoint::Custom { uri, .. } => uri,
    }
  }
}

/// Parses an endpoint string of the form `scheme://address`.
pub fn parse_endpoint(endpoint_str: &str) -> Result<Endpoint, NqError> {
  let invalid_endpoint_err = || NqError::InvalidEndpoint(endpoint_str.to_string());

  let separator_pos = endpoint_str.find("://").ok_or_else(invalid_endpoint_err)?;
  let scheme = &endpoint_str[..separator_pos];
  let address_part = &endpoint_str[separator_pos + 3..];

  if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
    return Err(invalid_endpoint_err());
  }
  if address_part.is_empty() || address_part.contains('\0') {
    return Err(invalid_endpoint_err());
  }

  match scheme {
    "tcp" => Ok(Endpoint::Tcp(address_part.to_string(), endpoint_str.to_string())),

    #[cfg(all(unix, feature = "ipc"))]
    "ipc" => Ok(Endpoint::Ipc(PathBuf::from(address_part), endpoint_str.to_string())),

    #[cfg(feature = "inproc")]
    "inproc" => Ok(Endpoint::Inproc(address_part.to_string(), endpoint_str.to_string())),

    _ => Ok(Endpoint::Custom {
      scheme: scheme.to_string(),
      address: address_part.to_string(),
      uri: endpoint_str.to_string(),
    }),
  }
}
