// src/options.rs

//! Typed option values and the copyin/copyout codec.
//!
//! Options travel through get/set calls either as a natively-typed
//! [`OptionValue`] or as an opaque byte buffer whose size must match the
//! scalar's native encoding exactly. Scalars use native-endian byte order,
//! matching how callers on the same host would have written them.

use crate::error::NqError;

use std::any::Any;
use std::fmt;
use std::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

// --- Well-known option names ---

/// The endpoint URL a listener was created with. Read-only; transports that
/// bind to wildcard addresses override the getter to report the resolved URL.
pub const OPT_URL: &str = "url";
/// Locally bound transport address.
pub const OPT_LOCADDR: &str = "local-address";
/// Maximum receive size accepted on pipes from this endpoint. 0 = unlimited.
pub const OPT_RECVMAXSZ: &str = "recv-size-max";
/// Human-readable socket name.
pub const OPT_SOCKNAME: &str = "socket-name";
/// Whether the socket is in raw mode. Read-only.
pub const OPT_RAW: &str = "raw";
/// Depth of the socket's accepted-pipe queue.
pub const OPT_PIPE_BACKLOG: &str = "pipe-backlog";

/// Disable Nagle's algorithm on accepted TCP streams.
pub const OPT_TCP_NODELAY: &str = "tcp-nodelay";
/// Enable TCP keepalive probes on accepted streams.
pub const OPT_TCP_KEEPALIVE: &str = "tcp-keepalive";
/// Idle time before the first keepalive probe, in milliseconds. -1 leaves
/// the system default in place.
pub const OPT_TCP_KEEPALIVE_IDLE: &str = "tcp-keepalive-idle";
/// The concrete TCP port a listener bound to. Read-only.
pub const OPT_TCP_BOUND_PORT: &str = "tcp-bound-port";
/// Listen backlog handed to the OS. Only settable before bind.
pub const OPT_TCP_BACKLOG: &str = "tcp-backlog";

/// Octal permission bits applied to the IPC socket file at bind time.
#[cfg(all(unix, feature = "ipc"))]
pub const OPT_IPC_PERMISSIONS: &str = "ipc:permissions";

/// Millisecond durations use -1 as the "infinite / unset" sentinel.
pub type DurationMs = i32;

/// Converts a millisecond option value into the `Option<Duration>` form used
/// internally. -1 maps to `None`.
pub(crate) fn ms_to_duration(ms: DurationMs) -> Option<Duration> {
  match ms {
    -1 => None,
    _ => Some(Duration::from_millis(ms as u64)),
  }
}

/// A typed option value supplied by a caller (the "copyin" source).
///
/// `Opaque` carries raw bytes whose length must equal the native encoding of
/// whatever kind the receiving option expects.
#[derive(Clone)]
pub enum OptionValue {
  Bool(bool),
  Int(i32),
  Size(usize),
  /// Milliseconds; -1 means infinite.
  Ms(DurationMs),
  U64(u64),
  Str(String),
  /// An opaque shared object, for options that exchange configured state
  /// (e.g. a preconfigured security context). Typed-only: there is no sound
  /// byte-level encoding of a shared pointer.
  Ptr(Arc<dyn Any + Send + Sync>),
  Opaque(Vec<u8>),
}

impl fmt::Debug for OptionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionValue::Bool(b) => write!(f, "Bool({})", b),
      OptionValue::Int(i) => write!(f, "Int({})", i),
      OptionValue::Size(s) => write!(f, "Size({})", s),
      OptionValue::Ms(d) => write!(f, "Ms({})", d),
      OptionValue::U64(u) => write!(f, "U64({})", u),
      OptionValue::Str(s) => write!(f, "Str({:?})", s),
      OptionValue::Ptr(_) => write!(f, "Ptr(..)"),
      OptionValue::Opaque(v) => write!(f, "Opaque({} bytes)", v.len()),
    }
  }
}

/// Destination for an option read (the "copyout" target).
///
/// The typed variants carry the size contract in the type itself. The opaque
/// variant keeps the original partial-copy contract: when `buf` is smaller
/// than the source, only what fits is copied, `len` still receives the full
/// required size, and the call reports `InvalidArgument` so the caller can
/// resize and retry.
pub enum OptionSink<'a> {
  Bool(&'a mut bool),
  Int(&'a mut i32),
  Size(&'a mut usize),
  Ms(&'a mut DurationMs),
  U64(&'a mut u64),
  Str(&'a mut String),
  SockAddr(&'a mut SocketAddr),
  Ptr(&'a mut Option<Arc<dyn Any + Send + Sync>>),
  Opaque { buf: &'a mut [u8], len: &'a mut usize },
}

fn opaque_size_err(expected: usize, got: usize) -> NqError {
  NqError::InvalidArgument(format!("opaque option value must be {} bytes, got {}", expected, got))
}

// --- copyin: caller value -> typed option ---

pub fn copyin_bool(src: &OptionValue) -> Result<bool, NqError> {
  match src {
    OptionValue::Bool(b) => Ok(*b),
    OptionValue::Opaque(v) if v.len() == 1 => Ok(v[0] != 0),
    OptionValue::Opaque(v) => Err(opaque_size_err(1, v.len())),
    _ => Err(NqError::BadType("bool")),
  }
}

/// Decodes an integer option, enforcing the inclusive `[min, max]` window.
pub fn copyin_int(src: &OptionValue, min: i32, max: i32) -> Result<i32, NqError> {
  let i = match src {
    OptionValue::Int(i) => *i,
    OptionValue::Opaque(v) => match <[u8; 4]>::try_from(v.as_slice()) {
      Ok(raw) => i32::from_ne_bytes(raw),
      Err(_) => return Err(opaque_size_err(size_of::<i32>(), v.len())),
    },
    _ => return Err(NqError::BadType("int")),
  };
  if i < min || i > max {
    return Err(NqError::InvalidArgument(format!(
      "value {} outside [{}, {}]",
      i, min, max
    )));
  }
  Ok(i)
}

/// Decodes a size option, enforcing the inclusive `[min, max]` window.
pub fn copyin_size(src: &OptionValue, min: usize, max: usize) -> Result<usize, NqError> {
  let s = match src {
    OptionValue::Size(s) => *s,
    OptionValue::Opaque(v) => match <[u8; size_of::<usize>()]>::try_from(v.as_slice()) {
      Ok(raw) => usize::from_ne_bytes(raw),
      Err(_) => return Err(opaque_size_err(size_of::<usize>(), v.len())),
    },
    _ => return Err(NqError::BadType("size")),
  };
  if s < min || s > max {
    return Err(NqError::InvalidArgument(format!(
      "value {} outside [{}, {}]",
      s, min, max
    )));
  }
  Ok(s)
}

/// Decodes a millisecond duration. Values below -1 are invalid.
pub fn copyin_ms(src: &OptionValue) -> Result<DurationMs, NqError> {
  let d = match src {
    OptionValue::Ms(d) => *d,
    OptionValue::Opaque(v) => match <[u8; 4]>::try_from(v.as_slice()) {
      Ok(raw) => DurationMs::from_ne_bytes(raw),
      Err(_) => return Err(opaque_size_err(size_of::<DurationMs>(), v.len())),
    },
    _ => return Err(NqError::BadType("duration")),
  };
  if d < -1 {
    return Err(NqError::InvalidArgument(format!("duration {} below -1", d)));
  }
  Ok(d)
}

pub fn copyin_u64(src: &OptionValue) -> Result<u64, NqError> {
  match src {
    OptionValue::U64(u) => Ok(*u),
    OptionValue::Opaque(v) => match <[u8; 8]>::try_from(v.as_slice()) {
      Ok(raw) => Ok(u64::from_ne_bytes(raw)),
      Err(_) => Err(opaque_size_err(size_of::<u64>(), v.len())),
    },
    _ => Err(NqError::BadType("u64")),
  }
}

/// Decodes a string option. `maxlen` counts the terminator, so a typed
/// string of `maxlen - 1` characters is the longest accepted. The opaque
/// form must contain a NUL terminator within the supplied bytes.
pub fn copyin_str(src: &OptionValue, maxlen: usize) -> Result<String, NqError> {
  match src {
    OptionValue::Str(s) => {
      if s.as_bytes().contains(&0) {
        return Err(NqError::InvalidArgument("string contains interior NUL".into()));
      }
      if s.len() + 1 > maxlen {
        return Err(NqError::InvalidArgument("string too long".into()));
      }
      Ok(s.clone())
    }
    OptionValue::Opaque(v) => {
      let nul = match v.iter().position(|&b| b == 0) {
        Some(p) => p,
        None => return Err(NqError::InvalidArgument("string missing terminator".into())),
      };
      if nul > maxlen {
        return Err(NqError::InvalidArgument("string too long".into()));
      }
      String::from_utf8(v[..nul].to_vec())
        .map_err(|_| NqError::InvalidArgument("string is not valid UTF-8".into()))
    }
    _ => Err(NqError::BadType("string")),
  }
}

pub fn copyin_ptr(src: &OptionValue) -> Result<Arc<dyn Any + Send + Sync>, NqError> {
  match src {
    OptionValue::Ptr(p) => Ok(p.clone()),
    _ => Err(NqError::BadType("pointer")),
  }
}

// --- copyout: typed option -> caller destination ---

/// Raw partial copy into an opaque destination.
///
/// Copies `min(dst.len(), src.len())` bytes and always reports the full
/// required size through `len`. A too-small destination is an error, but the
/// bytes that fit are copied anyway so the caller can resize and retry.
fn copyout_raw(src: &[u8], dst: &mut [u8], len: &mut usize) -> Result<(), NqError> {
  let copysz = src.len().min(dst.len());
  *len = src.len();
  dst[..copysz].copy_from_slice(&src[..copysz]);
  if src.len() > dst.len() {
    return Err(NqError::InvalidArgument("destination buffer too small".into()));
  }
  Ok(())
}

pub fn copyout_bool(b: bool, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Bool(out) => {
      **out = b;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => copyout_raw(&[u8::from(b)], buf, len),
    _ => Err(NqError::BadType("bool")),
  }
}

pub fn copyout_int(i: i32, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Int(out) => {
      **out = i;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => copyout_raw(&i.to_ne_bytes(), buf, len),
    _ => Err(NqError::BadType("int")),
  }
}

pub fn copyout_size(s: usize, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Size(out) => {
      **out = s;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => copyout_raw(&s.to_ne_bytes(), buf, len),
    _ => Err(NqError::BadType("size")),
  }
}

pub fn copyout_ms(d: DurationMs, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Ms(out) => {
      **out = d;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => copyout_raw(&d.to_ne_bytes(), buf, len),
    _ => Err(NqError::BadType("duration")),
  }
}

pub fn copyout_u64(u: u64, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::U64(out) => {
      **out = u;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => copyout_raw(&u.to_ne_bytes(), buf, len),
    _ => Err(NqError::BadType("u64")),
  }
}

/// Copies a string out. The typed form hands the caller a fresh owned copy;
/// the opaque form copies the bytes including the NUL terminator, under the
/// usual partial-copy rule.
pub fn copyout_str(s: &str, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Str(out) => {
      **out = s.to_string();
      Ok(())
    }
    OptionSink::Opaque { buf, len } => {
      let mut bytes = Vec::with_capacity(s.len() + 1);
      bytes.extend_from_slice(s.as_bytes());
      bytes.push(0);
      copyout_raw(&bytes, buf, len)
    }
    _ => Err(NqError::BadType("string")),
  }
}

/// Opaque socket-address encoding: family (u16) + port (u16) + 16 address
/// bytes, IPv4 occupying the first four. Fixed 20 bytes.
const SOCKADDR_WIRE_LEN: usize = 20;

pub fn copyout_sockaddr(sa: &SocketAddr, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::SockAddr(out) => {
      **out = *sa;
      Ok(())
    }
    OptionSink::Opaque { buf, len } => {
      let mut bytes = [0u8; SOCKADDR_WIRE_LEN];
      let family: u16 = if sa.is_ipv4() { 4 } else { 6 };
      bytes[0..2].copy_from_slice(&family.to_ne_bytes());
      bytes[2..4].copy_from_slice(&sa.port().to_ne_bytes());
      match sa.ip() {
        IpAddr::V4(ip) => bytes[4..8].copy_from_slice(&ip.octets()),
        IpAddr::V6(ip) => bytes[4..20].copy_from_slice(&ip.octets()),
      }
      copyout_raw(&bytes, buf, len)
    }
    _ => Err(NqError::BadType("sockaddr")),
  }
}

/// Decodes the opaque socket-address encoding produced by
/// [`copyout_sockaddr`]. Returns `None` for malformed input.
pub fn sockaddr_from_wire(bytes: &[u8]) -> Option<SocketAddr> {
  if bytes.len() != SOCKADDR_WIRE_LEN {
    return None;
  }
  let family = u16::from_ne_bytes(bytes[0..2].try_into().ok()?);
  let port = u16::from_ne_bytes(bytes[2..4].try_into().ok()?);
  match family {
    4 => {
      let octets: [u8; 4] = bytes[4..8].try_into().ok()?;
      Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port))
    }
    6 => {
      let octets: [u8; 16] = bytes[4..20].try_into().ok()?;
      Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
    }
    _ => None,
  }
}

pub fn copyout_ptr(p: &Arc<dyn Any + Send + Sync>, dst: &mut OptionSink<'_>) -> Result<(), NqError> {
  match dst {
    OptionSink::Ptr(out) => {
      **out = Some(p.clone());
      Ok(())
    }
    _ => Err(NqError::BadType("pointer")),
  }
}

// --- Per-target option tables ---

/// One entry in a target's option table. A missing getter makes the option
/// write-only; a missing setter makes it read-only.
pub struct OptionEntry<T: ?Sized> {
  pub name: &'static str,
  pub get: Option<fn(&T, &mut OptionSink<'_>) -> Result<(), NqError>>,
  pub set: Option<fn(&T, &OptionValue) -> Result<(), NqError>>,
}

/// Looks `name` up in `table` and invokes its getter.
pub fn table_get<T: ?Sized>(
  table: &[OptionEntry<T>],
  target: &T,
  name: &str,
  dst: &mut OptionSink<'_>,
) -> Result<(), NqError> {
  for entry in table {
    if entry.name != name {
      continue;
    }
    return match entry.get {
      Some(get) => get(target, dst),
      None => Err(NqError::WriteOnly),
    };
  }
  Err(NqError::UnsupportedOption(name.to_string()))
}

/// Looks `name` up in `table` and invokes its setter.
pub fn table_set<T: ?Sized>(
  table: &[OptionEntry<T>],
  target: &T,
  name: &str,
  value: &OptionValue,
) -> Result<(), NqError> {
  for entry in table {
    if entry.name != name {
      continue;
    }
    return match entry.set {
      Some(set) => set(target, value),
      None => Err(NqError::ReadOnly),
    };
  }
  Err(NqError::UnsupportedOption(name.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn int_round_trip_typed_and_opaque() {
    for v in [i32::MIN, -1, 0, 7, i32::MAX] {
      let mut out = 0i32;
      copyout_int(v, &mut OptionSink::Int(&mut out)).unwrap();
      assert_eq!(out, v);

      let mut buf = [0u8; 4];
      let mut len = 0usize;
      copyout_int(v, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }).unwrap();
      assert_eq!(len, 4);
      assert_eq!(copyin_int(&OptionValue::Opaque(buf.to_vec()), i32::MIN, i32::MAX).unwrap(), v);
    }
  }

  #[test]
  fn size_round_trip() {
    for v in [0usize, 1, 4096, usize::MAX] {
      let mut buf = [0u8; 8];
      let mut len = 0usize;
      copyout_size(v, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }).unwrap();
      assert_eq!(copyin_size(&OptionValue::Opaque(buf.to_vec()), 0, usize::MAX).unwrap(), v);
    }
  }

  #[test]
  fn bool_and_u64_and_ms_round_trip() {
    let mut b = false;
    copyout_bool(true, &mut OptionSink::Bool(&mut b)).unwrap();
    assert!(b);
    assert!(copyin_bool(&OptionValue::Opaque(vec![1])).unwrap());
    assert!(!copyin_bool(&OptionValue::Opaque(vec![0])).unwrap());

    let mut u = 0u64;
    copyout_u64(u64::MAX, &mut OptionSink::U64(&mut u)).unwrap();
    assert_eq!(u, u64::MAX);

    let mut d: DurationMs = 0;
    copyout_ms(-1, &mut OptionSink::Ms(&mut d)).unwrap();
    assert_eq!(d, -1);
    assert_eq!(copyin_ms(&OptionValue::Ms(250)).unwrap(), 250);
  }

  #[test]
  fn int_range_boundaries_inclusive() {
    let ok = |v: i32| copyin_int(&OptionValue::Int(v), 10, 20);
    assert!(ok(9).is_err());
    assert_eq!(ok(10).unwrap(), 10);
    assert_eq!(ok(20).unwrap(), 20);
    assert!(ok(21).is_err());
  }

  #[test]
  fn size_range_boundaries_inclusive() {
    let ok = |v: usize| copyin_size(&OptionValue::Size(v), 2, 4);
    assert!(ok(1).is_err());
    assert!(ok(2).is_ok());
    assert!(ok(4).is_ok());
    assert!(ok(5).is_err());
  }

  #[test]
  fn ms_below_negative_one_rejected() {
    assert!(matches!(
      copyin_ms(&OptionValue::Ms(-2)),
      Err(NqError::InvalidArgument(_))
    ));
  }

  #[test]
  fn wrong_opaque_size_rejected() {
    assert!(matches!(
      copyin_int(&OptionValue::Opaque(vec![0; 3]), 0, 100),
      Err(NqError::InvalidArgument(_))
    ));
    assert!(matches!(
      copyin_u64(&OptionValue::Opaque(vec![0; 4])),
      Err(NqError::InvalidArgument(_))
    ));
  }

  #[test]
  fn wrong_declared_type_rejected() {
    assert!(matches!(
      copyin_int(&OptionValue::Bool(true), 0, 100),
      Err(NqError::BadType(_))
    ));
    assert!(matches!(
      copyin_str(&OptionValue::Int(3), 16),
      Err(NqError::BadType(_))
    ));
    let mut out = 0i32;
    assert!(matches!(
      copyout_bool(true, &mut OptionSink::Int(&mut out)),
      Err(NqError::BadType(_))
    ));
  }

  #[test]
  fn opaque_truncation_contract() {
    // A 4-byte int into a 2-byte buffer: two bytes copied, required size
    // reported, error returned.
    let v: i32 = 0x0605_0403;
    let mut buf = [0u8; 2];
    let mut len = 0usize;
    let rv = copyout_int(v, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len });
    assert!(matches!(rv, Err(NqError::InvalidArgument(_))));
    assert_eq!(len, 4);
    assert_eq!(&buf[..], &v.to_ne_bytes()[..2]);
  }

  #[test]
  fn oversized_destination_reports_actual_size() {
    let mut buf = [0xffu8; 16];
    let mut len = 0usize;
    copyout_int(1, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }).unwrap();
    assert_eq!(len, 4);
    // Bytes past the source are untouched.
    assert_eq!(buf[4], 0xff);
  }

  #[test]
  fn str_copyin_terminator_rules() {
    // Opaque form requires a terminator within the supplied bytes.
    assert!(copyin_str(&OptionValue::Opaque(b"abc".to_vec()), 16).is_err());
    assert_eq!(copyin_str(&OptionValue::Opaque(b"abc\0".to_vec()), 16).unwrap(), "abc");
    // Length limits count the terminator for the typed form.
    assert!(copyin_str(&OptionValue::Str("abcd".into()), 4).is_err());
    assert_eq!(copyin_str(&OptionValue::Str("abc".into()), 4).unwrap(), "abc");
  }

  #[test]
  fn str_copyout_includes_terminator() {
    let mut buf = [0u8; 8];
    let mut len = 0usize;
    copyout_str("hi", &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }).unwrap();
    assert_eq!(len, 3);
    assert_eq!(&buf[..3], b"hi\0");

    let mut owned = String::new();
    copyout_str("hello", &mut OptionSink::Str(&mut owned)).unwrap();
    assert_eq!(owned, "hello");
  }

  #[test]
  fn sockaddr_round_trip() {
    let sa: SocketAddr = "127.0.0.1:5555".parse().unwrap();
    let mut out: SocketAddr = "0.0.0.0:0".parse().unwrap();
    copyout_sockaddr(&sa, &mut OptionSink::SockAddr(&mut out)).unwrap();
    assert_eq!(out, sa);

    let mut buf = [0u8; 20];
    let mut len = 0usize;
    copyout_sockaddr(&sa, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }).unwrap();
    assert_eq!(len, 20);
    assert_eq!(sockaddr_from_wire(&buf), Some(sa));
  }

  #[test]
  fn ptr_is_typed_only() {
    let p: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
    let mut buf = [0u8; 8];
    let mut len = 0usize;
    assert!(matches!(
      copyout_ptr(&p, &mut OptionSink::Opaque { buf: &mut buf, len: &mut len }),
      Err(NqError::BadType(_))
    ));
    let mut out: Option<Arc<dyn Any + Send + Sync>> = None;
    copyout_ptr(&p, &mut OptionSink::Ptr(&mut out)).unwrap();
    let got = out.unwrap().downcast::<u32>().unwrap();
    assert_eq!(*got, 42);
  }

  struct Target {
    value: std::sync::atomic::AtomicI32,
  }

  const TABLE: &[OptionEntry<Target>] = &[
    OptionEntry {
      name: "rw",
      get: Some(|t, dst| copyout_int(t.value.load(std::sync::atomic::Ordering::Relaxed), dst)),
      set: Some(|t, v| {
        t.value
          .store(copyin_int(v, 0, 100)?, std::sync::atomic::Ordering::Relaxed);
        Ok(())
      }),
    },
    OptionEntry { name: "ro", get: Some(|_, dst| copyout_int(7, dst)), set: None },
    OptionEntry {
      name: "wo",
      get: None,
      set: Some(|t, v| {
        t.value
          .store(copyin_int(v, 0, 100)?, std::sync::atomic::Ordering::Relaxed);
        Ok(())
      }),
    },
  ];

  #[test]
  fn table_dispatch_semantics() {
    let t = Target { value: std::sync::atomic::AtomicI32::new(0) };
    table_set(TABLE, &t, "rw", &OptionValue::Int(42)).unwrap();
    let mut out = 0i32;
    table_get(TABLE, &t, "rw", &mut OptionSink::Int(&mut out)).unwrap();
    assert_eq!(out, 42);

    assert!(matches!(
      table_set(TABLE, &t, "ro", &OptionValue::Int(1)),
      Err(NqError::ReadOnly)
    ));
    assert!(matches!(
      table_get(TABLE, &t, "wo", &mut OptionSink::Int(&mut out)),
      Err(NqError::WriteOnly)
    ));
    assert!(matches!(
      table_get(TABLE, &t, "nope", &mut OptionSink::Int(&mut out)),
      Err(NqError::UnsupportedOption(_))
    ));
  }
}
