//! The contract between the lifecycle manager and the underlying
//! realtime transport.
//!
//! Socket handling, media capture, and codec negotiation all live
//! behind these traits; the client never touches them directly. A
//! concrete implementation is injected through [`TransportFactory`].

use anyhow::Result;
use async_trait::async_trait;
use parley_core::{SessionConfig, WireEvent};
use secrecy::SecretString;
use tokio::sync::mpsc;

/// Construction parameters handed to a [`TransportFactory`].
#[derive(Debug, Clone)]
pub struct TransportParams {
    pub credential: SecretString,
    pub agent_id: String,
    pub route_id: &'static str,
    /// Permits a personal credential to be used directly from an
    /// untrusted host context.
    pub allow_unsafe_credential_use: bool,
}

impl TransportParams {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            credential: config.credential().clone(),
            agent_id: config.agent_id().to_owned(),
            route_id: config.route_id(),
            allow_unsafe_credential_use: true,
        }
    }
}

/// One underlying realtime connection.
///
/// `connect` and `disconnect` are network-affecting calls.
/// Implementations deliver inbound events on a single channel, in
/// arrival order.
#[async_trait]
pub trait RealtimeTransport: Send {
    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Takes the inbound event stream. Called at most once per
    /// transport; later calls return `None`.
    fn subscribe(&mut self) -> Option<mpsc::Receiver<WireEvent>>;
}

/// Opens transports on behalf of the lifecycle manager.
pub trait TransportFactory: Send + Sync {
    fn open(&self, params: TransportParams) -> Result<Box<dyn RealtimeTransport>>;
}
