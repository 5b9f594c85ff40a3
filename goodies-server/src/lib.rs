//! Server-side transports, metrics, and CLI surface for the goodies cache.
//! The storage engine itself lives in `goodies-engine`; this crate wires it
//! up to the network.

pub mod cli;
pub mod http;
pub mod metrics;
pub mod tcp;
