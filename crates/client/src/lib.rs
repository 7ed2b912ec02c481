//! Client runtime for parley conversation sessions.
//!
//! Wires the domain model from `parley-core` to its two external
//! collaborators, the device-permission probe and the realtime
//! transport, both injected as trait objects. The presentation layer
//! drives the client through [`client::ClientHandle`] and observes it
//! through read-only snapshots.

pub mod client;
pub mod permission;
pub mod session;
pub mod transport;

pub use client::{ClientHandle, ClientSnapshot, Command, spawn};
pub use permission::{PermissionProbe, PermissionResult, check_device_permission};
pub use session::{ConnectionState, Session, SessionManager};
pub use transport::{RealtimeTransport, TransportFactory, TransportParams};
