//! # Value model
//!
//! The tagged union stored under each key, replacing the untyped
//! `interface{}`/`Value interface{}` placeholder in
//! `original_source/goodies/storage.go`'s `goodiesItem` with an exhaustive
//! Rust enum matched at every access site (see SPEC_FULL.md §9).

use std::collections::HashMap;

/// Sentinel meaning "never expires" when stored as `expiry_at`.
pub const NEVER_EXPIRES: u128 = 0;

/// A caller-supplied time-to-live, as accepted by `Set`/`Update`/`SetExpiry`/
/// the command wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// `-1`: entry never expires.
    Never,
    /// `-2`: use the engine's configured default TTL.
    Default,
    /// `> 0`: expire `seconds` from now. `0` is folded into `Never` by callers.
    Seconds(u64),
}

impl Ttl {
    /// Parses the wire encoding: `-1` = never, `-2` = default, otherwise a
    /// nonnegative decimal integer of seconds. `0` is accepted and treated as
    /// "never expire" per spec §3.
    pub fn parse(text: &str) -> Option<Ttl> {
        let n: i64 = text.parse().ok()?;
        match n {
            -1 => Some(Ttl::Never),
            -2 => Some(Ttl::Default),
            n if n >= 0 => Some(Ttl::Seconds(n as u64)),
            _ => None,
        }
    }
}

/// The three value variants a key can hold.
///
/// A key's variant is fixed for the lifetime of its entry; changing variant
/// requires removing and re-creating the key (spec §3 invariants).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
    Dict(HashMap<String, String>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<String>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut HashMap<String, String>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// A stored `(value, expiry_at)` pair. `expiry_at` is an absolute instant in
/// nanoseconds since the epoch; `NEVER_EXPIRES` (`0`) means the entry never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    pub value: Value,
    pub expiry_at: u128,
}

impl Entry {
    pub fn is_expired(&self, now_nanos: u128) -> bool {
        self.expiry_at != NEVER_EXPIRES && now_nanos > self.expiry_at
    }
}
