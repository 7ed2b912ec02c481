//! Domain model for parley conversation sessions.
//!
//! This crate holds the I/O-free parts of the client: the session
//! configuration, the typed inbound event model, and the bounded
//! transcript reducer. The `parley-client` crate wires these to a
//! permission probe and a realtime transport.

pub mod config;
pub mod event;
pub mod transcript;

pub use config::{ConfigError, ROUTE_ID, SessionConfig};
pub use event::{ServerEvent, WireEvent};
pub use transcript::{TRANSCRIPT_CAPACITY, Transcript};
