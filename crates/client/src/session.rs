//! Session lifecycle: creation, connection, reconnection, teardown.

use crate::permission::PermissionResult;
use crate::transport::{RealtimeTransport, TransportFactory, TransportParams};
use anyhow::Result;
use parley_core::{SessionConfig, WireEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Connection lifecycle of the client as seen by the presentation
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconfigured,
    /// Configuration is complete; the permission probe has not granted
    /// audio access (yet).
    AwaitingPermission,
    /// A session exists but is not connected.
    Ready,
    Connected,
    /// Carries the transport error that forced the disconnect, when the
    /// disconnect was not requested.
    Disconnected { error: Option<String> },
}

/// Exclusive handle to one live or pending connection.
///
/// Only [`SessionManager::create_session`] produces one; the manager
/// destroys it when the owning scope exits or a replacement is
/// created. A destroyed handle keeps rejecting `connect` instead of
/// resurrecting a dead transport.
pub struct Session {
    transport: Option<Box<dyn RealtimeTransport>>,
    connected: bool,
}

impl Session {
    fn new(transport: Box<dyn RealtimeTransport>) -> Self {
        Self {
            transport: Some(transport),
            connected: false,
        }
    }

    /// Takes the ordered inbound event stream from the transport.
    pub fn subscribe(&mut self) -> Option<mpsc::Receiver<WireEvent>> {
        self.transport.as_mut().and_then(|t| t.subscribe())
    }

    /// Connects the underlying transport.
    ///
    /// Idempotent: a second call while connected changes nothing and
    /// never opens a second transport. Calling a destroyed handle is a
    /// logged no-op.
    pub async fn connect(&mut self) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            warn!("connect requested on a destroyed session");
            return Ok(());
        };
        if self.connected {
            return Ok(());
        }
        transport.connect().await?;
        self.connected = true;
        info!("session connected");
        Ok(())
    }

    /// Disconnects the underlying transport; idempotent.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        if !self.connected {
            return Ok(());
        }
        // Mark disconnected first so a failed call cannot leave the
        // handle claiming a live connection.
        self.connected = false;
        transport.disconnect().await?;
        info!("session disconnected");
        Ok(())
    }

    /// Releases the underlying transport, disconnecting first if
    /// needed. Safe to call more than once.
    pub async fn destroy(&mut self) {
        if let Err(err) = self.disconnect().await {
            warn!(error = ?err, "transport disconnect failed during teardown");
        }
        self.transport = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_destroyed(&self) -> bool {
        self.transport.is_none()
    }
}

/// Owns at most one [`Session`] per configuration lifetime.
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            session: None,
        }
    }

    /// Creates a session for `config` if permission allows.
    ///
    /// Returns `None` and changes nothing when audio permission is not
    /// granted. `permission` must be the value the probe just
    /// resolved, not an earlier snapshot. Any existing session is
    /// fully destroyed before the replacement transport is opened, so
    /// two live transports never coexist.
    pub async fn create_session(
        &mut self,
        config: &SessionConfig,
        permission: PermissionResult,
    ) -> Result<Option<&mut Session>> {
        if !permission.audio_granted {
            return Ok(None);
        }
        self.destroy_session().await;
        let transport = self.factory.open(TransportParams::from_config(config))?;
        info!(agent_id = config.agent_id(), "session created");
        Ok(Some(self.session.insert(Session::new(transport))))
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Destroys the current session, if any.
    pub async fn destroy_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy().await;
            info!("session destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        connects: AtomicUsize,
        disconnects: AtomicUsize,
    }

    struct CountingTransport {
        counters: Arc<Counters>,
        events: Option<mpsc::Receiver<WireEvent>>,
    }

    #[async_trait]
    impl RealtimeTransport for CountingTransport {
        async fn connect(&mut self) -> Result<()> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn subscribe(&mut self) -> Option<mpsc::Receiver<WireEvent>> {
            self.events.take()
        }
    }

    struct CountingFactory {
        counters: Arc<Counters>,
    }

    impl TransportFactory for CountingFactory {
        fn open(&self, _params: TransportParams) -> Result<Box<dyn RealtimeTransport>> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let (_tx, rx) = mpsc::channel(8);
            Ok(Box::new(CountingTransport {
                counters: Arc::clone(&self.counters),
                events: Some(rx),
            }))
        }
    }

    fn manager() -> (SessionManager, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let factory = Arc::new(CountingFactory {
            counters: Arc::clone(&counters),
        });
        (SessionManager::new(factory), counters)
    }

    fn config() -> SessionConfig {
        SessionConfig::new("pat_abc123", "agent-7").expect("valid config")
    }

    #[tokio::test]
    async fn denied_permission_creates_nothing() {
        let (mut manager, counters) = manager();
        let created = manager
            .create_session(&config(), PermissionResult::DENIED)
            .await
            .expect("no transport error");
        assert!(created.is_none());
        assert!(!manager.has_session());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (mut manager, counters) = manager();
        let session = manager
            .create_session(&config(), PermissionResult::GRANTED)
            .await
            .expect("no transport error")
            .expect("session created");
        session.connect().await.expect("connect");
        session.connect().await.expect("reconnect is a no-op");
        assert!(session.is_connected());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replacement_destroys_prior_session() {
        let (mut manager, counters) = manager();
        manager
            .create_session(&config(), PermissionResult::GRANTED)
            .await
            .expect("no transport error")
            .expect("session created")
            .connect()
            .await
            .expect("connect");

        manager
            .create_session(&config(), PermissionResult::GRANTED)
            .await
            .expect("no transport error")
            .expect("session created");

        assert_eq!(counters.opened.load(Ordering::SeqCst), 2);
        // The first transport was disconnected before the second opened.
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroyed_handle_rejects_connect() {
        let (mut manager, counters) = manager();
        let session = manager
            .create_session(&config(), PermissionResult::GRANTED)
            .await
            .expect("no transport error")
            .expect("session created");
        session.connect().await.expect("connect");
        session.destroy().await;
        assert!(session.is_destroyed());
        assert!(!session.is_connected());

        session.connect().await.expect("no-op");
        assert!(!session.is_connected());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_then_destroy_is_safe() {
        let (mut manager, counters) = manager();
        let session = manager
            .create_session(&config(), PermissionResult::GRANTED)
            .await
            .expect("no transport error")
            .expect("session created");
        session.connect().await.expect("connect");
        session.disconnect().await.expect("disconnect");
        session.disconnect().await.expect("second disconnect no-op");
        manager.destroy_session().await;
        assert!(!manager.has_session());
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
    }
}
