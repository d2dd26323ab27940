//! Typed views of the backend's record collections.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Collection holding per-system alert thresholds.
pub const ALERTS: &str = "alerts";

/// Collection holding monitored systems.
pub const SYSTEMS: &str = "systems";

/// Collection holding per-user dashboard settings.
pub const USER_SETTINGS: &str = "user_settings";

/// An alert threshold stored on the backend.
///
/// At most one record exists per `(system, name)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Record id.
    pub id: String,
    /// Id of the system this alert watches.
    pub system: String,
    /// Alert kind name, e.g. `"CPU"`.
    pub name: String,
    /// Threshold value.
    #[serde(default)]
    pub value: f64,
    /// Minutes the threshold must be exceeded before firing.
    #[serde(default)]
    pub min: u32,
    /// Whether the alert is currently triggered.
    #[serde(default)]
    pub triggered: bool,
    /// Owning user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A monitored host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRecord {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Host name or IP address of the agent.
    #[serde(default)]
    pub host: String,
    /// Agent port.
    #[serde(default)]
    pub port: String,
    /// Last reported status, e.g. `"up"`.
    #[serde(default)]
    pub status: String,
    /// Users allowed to see this system.
    #[serde(default)]
    pub users: Vec<String>,
}

/// The settings record of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettingsRecord {
    /// Record id.
    pub id: String,
    /// Free-form settings object.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Decodes a raw record into a typed view.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the record does not have the
/// expected shape.
pub fn decode<T: DeserializeOwned>(record: Value) -> StoreResult<T> {
    serde_json::from_value(record).map_err(StoreError::from)
}

/// Decodes every record in `records`, failing on the first bad one.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if any record has the wrong shape.
pub fn decode_all<T: DeserializeOwned>(records: Vec<Value>) -> StoreResult<Vec<T>> {
    records.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_alert_record_with_defaults() {
        let record: AlertRecord = decode(json!({
            "id": "a1",
            "system": "s1",
            "name": "CPU",
            "value": 80,
        }))
        .unwrap();

        assert_eq!(record.id, "a1");
        assert_eq!(record.system, "s1");
        assert!((record.value - 80.0).abs() < f64::EPSILON);
        assert_eq!(record.min, 0);
        assert!(!record.triggered);
        assert!(record.user.is_none());
    }

    #[test]
    fn decode_system_record() {
        let record: SystemRecord = decode(json!({
            "id": "s1",
            "name": "web-01",
            "host": "10.0.0.5",
            "port": "45876",
            "status": "up",
            "users": ["u1"],
        }))
        .unwrap();

        assert_eq!(record.name, "web-01");
        assert_eq!(record.users, vec!["u1".to_string()]);
    }

    #[test]
    fn decode_all_fails_on_bad_record() {
        let result: StoreResult<Vec<AlertRecord>> =
            decode_all(vec![json!({"id": "a1", "system": "s1", "name": "CPU"}), json!(42)]);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn alert_record_omits_missing_user() {
        let record = AlertRecord {
            id: "a1".into(),
            system: "s1".into(),
            name: "Disk".into(),
            value: 90.0,
            min: 5,
            triggered: false,
            user: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("user").is_none());
    }
}
