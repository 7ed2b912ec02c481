//! Drives the client against a canned transport and prints transcript
//! lines as they arrive.
//!
//! `PARLEY_CREDENTIAL` and `PARLEY_AGENT_ID` override the demo
//! configuration; both fall back to placeholder values.

use anyhow::Result;
use async_trait::async_trait;
use parley_client::{
    PermissionProbe, PermissionResult, RealtimeTransport, TransportFactory, TransportParams, spawn,
};
use parley_core::WireEvent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

struct AlwaysGranted;

#[async_trait]
impl PermissionProbe for AlwaysGranted {
    async fn probe(&self) -> Result<PermissionResult> {
        Ok(PermissionResult::GRANTED)
    }
}

/// Transport that replays a scripted conversation after `connect`.
struct CannedTransport {
    feeder: Option<mpsc::Sender<WireEvent>>,
    events: Option<mpsc::Receiver<WireEvent>>,
}

#[async_trait]
impl RealtimeTransport for CannedTransport {
    async fn connect(&mut self) -> Result<()> {
        let Some(tx) = self.feeder.take() else {
            return Ok(());
        };
        tokio::spawn(async move {
            let script = vec![
                WireEvent::new(
                    "server.conversation.created",
                    json!({"prologue": "Welcome back."}),
                ),
                WireEvent::new(
                    "server.conversation.message.completed",
                    json!({"type": "question", "content_type": "text", "content": "What should we cover today?"}),
                ),
                WireEvent::new(
                    "server.conversation.message.completed",
                    json!({"type": "function_call", "content_type": "text", "content": "lookup"}),
                ),
                WireEvent::new(
                    "server.conversation.message.completed",
                    json!({"type": "answer", "content_type": "text", "content": "Let's pick up where we left off."}),
                ),
            ];
            for event in script {
                tokio::time::sleep(Duration::from_millis(200)).await;
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&mut self) -> Option<mpsc::Receiver<WireEvent>> {
        self.events.take()
    }
}

struct CannedFactory;

impl TransportFactory for CannedFactory {
    fn open(&self, params: TransportParams) -> Result<Box<dyn RealtimeTransport>> {
        info!(agent_id = %params.agent_id, route_id = params.route_id, "opening canned transport");
        let (tx, rx) = mpsc::channel(16);
        Ok(Box::new(CannedTransport {
            feeder: Some(tx),
            events: Some(rx),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let credential =
        std::env::var("PARLEY_CREDENTIAL").unwrap_or_else(|_| "pat_demo".to_string());
    let agent_id = std::env::var("PARLEY_AGENT_ID").unwrap_or_else(|_| "agent-demo".to_string());

    let handle = spawn(Arc::new(AlwaysGranted), Arc::new(CannedFactory));
    handle.configure(credential, agent_id).await?;

    let mut snapshots = handle.snapshots();
    let mut printed = 0;
    loop {
        if snapshots.changed().await.is_err() {
            break;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        for line in snapshot.transcript.iter().skip(printed) {
            println!("> {line}");
        }
        printed = printed.max(snapshot.transcript.len());
        if snapshot.transcript.len() >= 4 {
            break;
        }
    }

    handle.shutdown().await;
    Ok(())
}
