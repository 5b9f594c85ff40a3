//! Shared types for the goodies cache: the closed error taxonomy and the
//! wire-level request/response records used by every transport and by the
//! client library.

pub mod error;
pub mod wire;

pub use error::{GoodiesError, GoodiesResult};
pub use wire::{CommandRequest, CommandResponse, JsonSerializer, WireSerializer};
