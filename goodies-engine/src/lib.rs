//! Core of the goodies cache: the typed storage engine, its command
//! dispatch table, and the background snapshot persister.

pub mod persist;
pub mod processor;
pub mod store;
pub mod value;

pub use persist::Persister;
pub use processor::CommandProcessor;
pub use store::Store;
pub use value::{Entry, Ttl, Value};
