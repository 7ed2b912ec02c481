//! Session configuration, built once from user input.

use secrecy::SecretString;

/// Connector route identifier sent with every session the client opens.
pub const ROUTE_ID: &str = "1024";

/// A configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("credential must not be empty")]
    MissingCredential,
    #[error("agent id must not be empty")]
    MissingAgentId,
}

/// Immutable parameters for one conversation session.
///
/// The credential is wrapped in [`SecretString`] so it is redacted from
/// `Debug` output and never lands in logs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    credential: SecretString,
    agent_id: String,
}

impl SessionConfig {
    /// Validates user input and builds a session configuration.
    ///
    /// Both fields must be non-empty before a session may be created.
    pub fn new(
        credential: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let credential = credential.into();
        let agent_id = agent_id.into();
        if credential.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if agent_id.is_empty() {
            return Err(ConfigError::MissingAgentId);
        }
        Ok(Self {
            credential: SecretString::from(credential),
            agent_id,
        })
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn route_id(&self) -> &'static str {
        ROUTE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn accepts_complete_input() {
        let config = SessionConfig::new("pat_abc123", "agent-7").expect("valid config");
        assert_eq!(config.credential().expose_secret(), "pat_abc123");
        assert_eq!(config.agent_id(), "agent-7");
        assert_eq!(config.route_id(), ROUTE_ID);
    }

    #[test]
    fn rejects_empty_credential() {
        let err = SessionConfig::new("", "agent-7").unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
    }

    #[test]
    fn rejects_empty_agent_id() {
        let err = SessionConfig::new("pat_abc123", "").unwrap_err();
        assert_eq!(err, ConfigError::MissingAgentId);
    }

    #[test]
    fn debug_output_redacts_credential() {
        let config = SessionConfig::new("pat_abc123", "agent-7").expect("valid config");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("pat_abc123"));
        assert!(rendered.contains("agent-7"));
    }
}
