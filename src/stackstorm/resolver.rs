use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StackStormError;
use super::connections::ConnectionsConfig;
use crate::session::Payload;

pub const CONNECTION_KEY: &str = "stackstorm_connection";
/// Selection value meaning "use the inline endpoint".
pub const CUSTOM_CONNECTION: &str = "custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomConnection {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Connection selection as stored in a session payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub custom_connection: Option<CustomConnection>,
}

impl StoredConnection {
    /// Reads the selection out of a payload. Malformed entries count as no selection.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        payload
            .get(CONNECTION_KEY)
            .filter(|value| !value.is_null())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(
            CONNECTION_KEY.to_string(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        );
        payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub url: String,
    pub api_key: Option<String>,
}

/// Picks the StackStorm endpoint for a session: the inline custom connection, the
/// selected preconfigured one, or the configured default.
pub fn resolve(
    payload: Option<&Payload>,
    connections: &ConnectionsConfig,
) -> Result<ResolvedConnection, StackStormError> {
    let stored = payload.and_then(StoredConnection::from_payload);

    let current = match stored {
        Some(StoredConnection {
            current: Some(current),
            custom_connection,
        }) if current == CUSTOM_CONNECTION => {
            let custom = custom_connection.ok_or(StackStormError::MissingCustomConnection)?;
            return Ok(ResolvedConnection {
                url: custom.url,
                api_key: custom.api_key,
            });
        }
        Some(StoredConnection {
            current: Some(current),
            ..
        }) if !current.is_empty() => current,
        _ => connections
            .default
            .clone()
            .ok_or(StackStormError::NoConnection)?,
    };

    let entry = connections
        .by_id(&current)
        .ok_or_else(|| StackStormError::UnknownConnection(current.clone()))?;

    Ok(ResolvedConnection {
        url: entry.url.clone(),
        api_key: entry.api_key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stackstorm::ConnectionEntry;
    use serde_json::json;

    fn connections() -> ConnectionsConfig {
        ConnectionsConfig {
            default: Some("prod".into()),
            connections: vec![
                ConnectionEntry {
                    id: "prod".into(),
                    alias: None,
                    url: "https://prod".into(),
                    api_key: Some("prod-key".into()),
                },
                ConnectionEntry {
                    id: "lab".into(),
                    alias: None,
                    url: "http://lab".into(),
                    api_key: None,
                },
            ],
        }
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_falls_back_to_default() {
        let resolved = resolve(None, &connections()).unwrap();
        assert_eq!(resolved.url, "https://prod");

        let resolved = resolve(Some(&payload(json!({"other": 1}))), &connections()).unwrap();
        assert_eq!(resolved.api_key.as_deref(), Some("prod-key"));
    }

    #[test]
    fn test_selected_connection() {
        let data = payload(json!({"stackstorm_connection": {"current": "lab"}}));
        let resolved = resolve(Some(&data), &connections()).unwrap();
        assert_eq!(resolved.url, "http://lab");
        assert_eq!(resolved.api_key, None);
    }

    #[test]
    fn test_custom_connection() {
        let data = payload(json!({
            "stackstorm_connection": {
                "current": "custom",
                "custom_connection": {"url": "http://mine", "api_key": "secret"}
            }
        }));
        let resolved = resolve(Some(&data), &connections()).unwrap();
        assert_eq!(resolved.url, "http://mine");
        assert_eq!(resolved.api_key.as_deref(), Some("secret"));

        let data = payload(json!({"stackstorm_connection": {"current": "custom"}}));
        assert!(matches!(
            resolve(Some(&data), &connections()),
            Err(StackStormError::MissingCustomConnection)
        ));
    }

    #[test]
    fn test_unknown_or_missing_connection() {
        let data = payload(json!({"stackstorm_connection": {"current": "gone"}}));
        assert!(matches!(
            resolve(Some(&data), &connections()),
            Err(StackStormError::UnknownConnection(id)) if id == "gone"
        ));

        assert!(matches!(
            resolve(None, &ConnectionsConfig::default()),
            Err(StackStormError::NoConnection)
        ));
    }

    #[test]
    fn test_stored_connection_round_trips_through_payload() {
        let stored = StoredConnection {
            current: Some("custom".into()),
            custom_connection: Some(CustomConnection {
                url: "http://mine".into(),
                api_key: None,
            }),
        };
        let data = stored.clone().into_payload();
        assert_eq!(StoredConnection::from_payload(&data), Some(stored));
    }
}
