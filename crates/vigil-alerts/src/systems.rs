//! Registering monitored systems.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use vigil_store::{RecordStore, StoreError, SystemRecord, records};

use crate::error::{AlertError, Result};

/// Port the monitoring agent listens on by default.
pub const DEFAULT_AGENT_PORT: &str = "45876";

/// A system to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSystem {
    /// Display name.
    pub name: String,
    /// Host name or IP address of the agent.
    pub host: String,
    /// Agent port.
    pub port: String,
}

impl NewSystem {
    /// Creates a registration on the default agent port.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_AGENT_PORT.to_string(),
        }
    }

    /// Overrides the agent port.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Checks that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidSystem` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidSystem {
                reason: "name is empty".to_string(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(AlertError::InvalidSystem {
                reason: "host is empty".to_string(),
            });
        }
        if !matches!(self.port.parse::<u16>(), Ok(port) if port != 0) {
            return Err(AlertError::InvalidSystem {
                reason: format!("port '{}' is not a valid port", self.port),
            });
        }
        Ok(())
    }
}

/// Creates a `systems` record owned by the current user.
///
/// # Errors
///
/// Returns `AlertError::InvalidSystem` for a bad registration,
/// `StoreError::Unauthenticated` when no user is signed in, and
/// `AlertError::Store` if the backend rejects it.
pub async fn register_system(store: &dyn RecordStore, system: &NewSystem) -> Result<SystemRecord> {
    system.validate()?;

    let owner = store.user_id().ok_or(StoreError::Unauthenticated)?;
    let fields = json!({
        "name": system.name.trim(),
        "host": system.host.trim(),
        "port": system.port,
        "users": [owner],
    });

    let record: SystemRecord = records::decode(store.create(records::SYSTEMS, fields).await?)?;
    info!(system_id = %record.id, name = %record.name, host = %record.host, "registered system");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use vigil_store::MemoryStore;

    #[test_case("", "10.0.0.1", "45876", "name is empty" ; "empty name")]
    #[test_case("web", "  ", "45876", "host is empty" ; "blank host")]
    #[test_case("web", "10.0.0.1", "http", "not a valid port" ; "non numeric port")]
    #[test_case("web", "10.0.0.1", "0", "not a valid port" ; "zero port")]
    fn invalid_registration(name: &str, host: &str, port: &str, expected: &str) {
        let err = NewSystem::new(name, host).with_port(port).validate().unwrap_err();
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[test]
    fn default_port() {
        assert_eq!(NewSystem::new("web", "10.0.0.1").port, "45876");
    }

    #[tokio::test]
    async fn register_assigns_current_user() {
        let store = MemoryStore::with_user("u1");

        let record = register_system(&store, &NewSystem::new(" web ", "10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(record.name, "web");
        assert_eq!(record.port, DEFAULT_AGENT_PORT);
        assert_eq!(record.users, vec!["u1".to_string()]);
        assert_eq!(store.records(records::SYSTEMS).len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_before_writing() {
        let store = MemoryStore::with_user("u1");

        let result = register_system(&store, &NewSystem::new("web", "")).await;

        assert!(matches!(result, Err(AlertError::InvalidSystem { .. })));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn register_requires_signed_in_user() {
        let store = MemoryStore::new();

        let result = register_system(&store, &NewSystem::new("web", "10.0.0.1")).await;

        assert!(matches!(result, Err(AlertError::Store(StoreError::Unauthenticated))));
        assert!(store.records(records::SYSTEMS).is_empty());
    }

    #[tokio::test]
    async fn register_surfaces_store_failure() {
        let store = MemoryStore::with_user("u1");
        store.fail_writes_to(records::SYSTEMS);

        let result = register_system(&store, &NewSystem::new("web", "10.0.0.1")).await;

        assert!(matches!(result, Err(AlertError::Store(StoreError::Rejected { .. }))));
    }
}
