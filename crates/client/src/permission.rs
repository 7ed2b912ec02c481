//! Device permission probing and the gate policy around it.

use async_trait::async_trait;
use tracing::warn;

/// Outcome of one device-permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionResult {
    pub audio_granted: bool,
}

impl PermissionResult {
    pub const GRANTED: Self = Self {
        audio_granted: true,
    };
    pub const DENIED: Self = Self {
        audio_granted: false,
    };
}

/// Asynchronous query of host device-permission state.
///
/// Implementations only read environment state; probing repeatedly is
/// wasteful but safe.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn probe(&self) -> anyhow::Result<PermissionResult>;
}

/// Runs the probe, treating a probe failure as a denial.
///
/// A failed probe surfaces as a blocked state the user can see, not as
/// an error the caller has to handle.
pub async fn check_device_permission(probe: &dyn PermissionProbe) -> PermissionResult {
    match probe.probe().await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = ?err, "permission probe failed, treating audio as not granted");
            PermissionResult::DENIED
        }
    }
}
