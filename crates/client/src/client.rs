//! The client runtime: one task owning the session lifecycle and the
//! transcript, driven by presentation commands and inbound events.
//!
//! The runtime replaces ad-hoc effect re-runs with an explicit owner:
//! every state transition happens inside a single `select!` loop, so
//! events are folded strictly one at a time and teardown runs on every
//! exit path. Presentation code talks to it through [`ClientHandle`].

use crate::permission::{PermissionProbe, PermissionResult, check_device_permission};
use crate::session::{ConnectionState, SessionManager};
use crate::transport::TransportFactory;
use anyhow::{Result, anyhow};
use parley_core::{ServerEvent, SessionConfig, Transcript, WireEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Requests issued by the presentation layer.
#[derive(Debug)]
pub enum Command {
    /// Submit credential and agent id, superseding any prior
    /// configuration.
    Configure {
        credential: String,
        agent_id: String,
    },
    /// Join (or re-join) the conversation.
    Connect,
    /// Leave the conversation, keeping the session for a later
    /// re-join.
    Disconnect,
    /// Tear down the session and stop the runtime.
    Shutdown,
}

/// Read-only view published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    pub state: ConnectionState,
    /// `None` until the probe for the current configuration resolves.
    pub audio_granted: Option<bool>,
    /// Rolling transcript, oldest line first.
    pub transcript: Vec<String>,
}

impl ClientSnapshot {
    fn initial() -> Self {
        Self {
            state: ConnectionState::Unconfigured,
            audio_granted: None,
            transcript: Vec::new(),
        }
    }
}

/// Presentation-side handle to a running client.
///
/// Dropping the handle closes the command channel, which makes the
/// runtime destroy any live session before it stops.
pub struct ClientHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<ClientSnapshot>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    pub async fn configure(
        &self,
        credential: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Result<()> {
        self.send(Command::Configure {
            credential: credential.into(),
            agent_id: agent_id.into(),
        })
        .await
    }

    pub async fn connect(&self) -> Result<()> {
        self.send(Command::Connect).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect).await
    }

    /// Stops the runtime, destroying any live session first.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A watch receiver for awaiting snapshot changes.
    pub fn snapshots(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("client runtime is not running"))
    }
}

/// Spawns the client runtime and returns the presentation handle.
pub fn spawn(probe: Arc<dyn PermissionProbe>, factory: Arc<dyn TransportFactory>) -> ClientHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (snapshot_tx, snapshot_rx) = watch::channel(ClientSnapshot::initial());
    let task = tokio::spawn(run_client(probe, factory, command_rx, snapshot_tx));
    ClientHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        task,
    }
}

struct ClientRuntime {
    probe: Arc<dyn PermissionProbe>,
    manager: SessionManager,
    snapshots: watch::Sender<ClientSnapshot>,
    state: ConnectionState,
    audio_granted: Option<bool>,
    transcript: Transcript,
    config: Option<SessionConfig>,
    /// Monotonic token identifying the current configuration; probe
    /// completions carrying an older token are discarded.
    generation: u64,
}

async fn run_client(
    probe: Arc<dyn PermissionProbe>,
    factory: Arc<dyn TransportFactory>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<ClientSnapshot>,
) {
    let (probe_tx, mut probe_rx) = mpsc::channel::<(u64, PermissionResult)>(4);
    let mut events: Option<mpsc::Receiver<WireEvent>> = None;
    let mut rt = ClientRuntime {
        probe,
        manager: SessionManager::new(factory),
        snapshots,
        state: ConnectionState::Unconfigured,
        audio_granted: None,
        transcript: Transcript::new(),
        config: None,
        generation: 0,
    };
    rt.publish();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Configure { credential, agent_id }) => {
                    rt.handle_configure(credential, agent_id, &mut events, &probe_tx).await;
                }
                Some(Command::Connect) => rt.handle_connect().await,
                Some(Command::Disconnect) => rt.handle_disconnect().await,
                Some(Command::Shutdown) => break,
                // All handles dropped; tear down.
                None => break,
            },
            Some((generation, result)) = probe_rx.recv() => {
                rt.handle_probe_result(generation, result, &mut events).await;
            }
            inbound = next_event(&mut events), if events.is_some() => match inbound {
                Some(event) => rt.handle_event(event),
                None => {
                    events = None;
                    rt.handle_stream_closed();
                }
            },
        }
    }

    rt.manager.destroy_session().await;
    rt.state = ConnectionState::Disconnected { error: None };
    rt.publish();
    info!("client runtime stopped");
}

async fn next_event(events: &mut Option<mpsc::Receiver<WireEvent>>) -> Option<WireEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl ClientRuntime {
    async fn handle_configure(
        &mut self,
        credential: String,
        agent_id: String,
        events: &mut Option<mpsc::Receiver<WireEvent>>,
        probe_tx: &mpsc::Sender<(u64, PermissionResult)>,
    ) {
        // Supersede any in-flight probe and release the old session
        // before the new configuration takes effect.
        self.generation += 1;
        *events = None;
        self.manager.destroy_session().await;
        self.transcript = Transcript::new();
        self.audio_granted = None;

        match SessionConfig::new(credential, agent_id) {
            Ok(config) => {
                info!(agent_id = config.agent_id(), "configuration accepted");
                self.config = Some(config);
                self.state = ConnectionState::AwaitingPermission;
                self.spawn_probe(probe_tx);
            }
            Err(err) => {
                warn!(error = %err, "configuration rejected");
                self.config = None;
                self.state = ConnectionState::Unconfigured;
            }
        }
        self.publish();
    }

    fn spawn_probe(&self, probe_tx: &mpsc::Sender<(u64, PermissionResult)>) {
        let generation = self.generation;
        let probe = Arc::clone(&self.probe);
        let tx = probe_tx.clone();
        tokio::spawn(async move {
            let result = check_device_permission(probe.as_ref()).await;
            let _ = tx.send((generation, result)).await;
        });
    }

    async fn handle_probe_result(
        &mut self,
        generation: u64,
        result: PermissionResult,
        events: &mut Option<mpsc::Receiver<WireEvent>>,
    ) {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                "discarding superseded probe result"
            );
            return;
        }
        self.audio_granted = Some(result.audio_granted);

        let Some(config) = self.config.clone() else {
            return;
        };
        if !result.audio_granted {
            info!("audio permission not granted, session blocked");
            self.publish();
            return;
        }

        // Gate on the result the probe just resolved, never a stale
        // snapshot of it.
        match self.manager.create_session(&config, result).await {
            Ok(Some(session)) => {
                *events = session.subscribe();
                self.transcript = Transcript::new();
                self.state = ConnectionState::Ready;
                self.publish();
                self.handle_connect().await;
            }
            Ok(None) => {}
            Err(err) => {
                error!(error = ?err, "failed to open session transport");
                self.state = ConnectionState::Disconnected {
                    error: Some(err.to_string()),
                };
                self.publish();
            }
        }
    }

    async fn handle_connect(&mut self) {
        let Some(session) = self.manager.session_mut() else {
            warn!("connect requested without a session");
            return;
        };
        match session.connect().await {
            Ok(()) => self.state = ConnectionState::Connected,
            Err(err) => {
                error!(error = ?err, "transport connect failed");
                self.state = ConnectionState::Disconnected {
                    error: Some(err.to_string()),
                };
            }
        }
        self.publish();
    }

    async fn handle_disconnect(&mut self) {
        let Some(session) = self.manager.session_mut() else {
            warn!("disconnect requested without a session");
            return;
        };
        match session.disconnect().await {
            Ok(()) => self.state = ConnectionState::Disconnected { error: None },
            Err(err) => {
                error!(error = ?err, "transport disconnect failed");
                self.state = ConnectionState::Disconnected {
                    error: Some(err.to_string()),
                };
            }
        }
        self.publish();
    }

    fn handle_event(&mut self, event: WireEvent) {
        debug!(name = %event.name, "inbound event");
        let event = ServerEvent::classify(event);
        self.transcript.apply(&event);
        self.publish();
    }

    fn handle_stream_closed(&mut self) {
        if self.state == ConnectionState::Connected {
            warn!("event stream closed by transport");
            self.state = ConnectionState::Disconnected {
                error: Some("event stream closed".to_string()),
            };
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(ClientSnapshot {
            state: self.state.clone(),
            audio_granted: self.audio_granted,
            transcript: self.transcript.to_lines(),
        });
    }
}
