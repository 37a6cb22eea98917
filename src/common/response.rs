use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::common::error::AgentError;
use crate::common::snapshot::{ConfType, ConfigurationSnapshot};

pub const REGISTER_PATH: &str = "/api/node/register";
pub const UNREGISTER_PATH: &str = "/api/node/unregister";
pub const HEARTBEAT_PATH: &str = "/api/node/heartbeat";
pub const LOAD_CONFIGURATION_PATH: &str = "/api/configuration/load";

/// Common envelope wrapping every coordinator response. `code == 0` is success.
/// `data` stays untyped until the code has been checked, so a rejection keeps
/// the coordinator's message whatever shape its payload has.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(rename = "originUrl", default)]
    pub origin_url: String,
}

impl ApiResponse {
    fn check(&self, endpoint: &'static str) -> Result<(), AgentError> {
        if self.code != 0 {
            let message = if self.message.is_empty() {
                self.error.clone()
            } else {
                self.message.clone()
            };
            return Err(AgentError::Api {
                endpoint,
                code: self.code,
                message,
            });
        }
        Ok(())
    }

    /// Checks the response code, then decodes the payload.
    pub fn into_data<T>(self, endpoint: &'static str) -> Result<T, AgentError>
    where
        T: DeserializeOwned,
    {
        self.check(endpoint)?;
        match self.data {
            None | Some(Value::Null) => Err(AgentError::MissingData { endpoint }),
            Some(data) => serde_json::from_value(data).map_err(|e| AgentError::Api {
                endpoint,
                code: -1,
                message: format!("invalid response data: {}", e),
            }),
        }
    }

    /// Checks the response code for endpoints without a payload.
    pub fn into_unit(self, endpoint: &'static str) -> Result<(), AgentError> {
        self.check(endpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub ip: String,
    pub tag: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "workerID")]
    pub worker_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterRequest {
    #[serde(rename = "workerId")]
    pub worker_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(rename = "workerId")]
    pub worker_id: i32,
    pub ip: String,
    pub port: u16,
    #[serde(
        rename = "lastSourcesTime",
        default,
        deserialize_with = "deserialize_wire_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_sources_time: Option<DateTime<Utc>>,
}

/// Per-tick liveness answer. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    #[serde(rename = "lastSourcesTime", default, deserialize_with = "deserialize_wire_time")]
    pub last_sources_time: Option<DateTime<Utc>>,
    #[serde(rename = "lastSinksTime", default, deserialize_with = "deserialize_wire_time")]
    pub last_sinks_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kill: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    #[serde(rename = "workerId")]
    pub worker_id: i32,
    #[serde(rename = "confType")]
    pub conf_type: ConfType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationResponse {
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub data: BTreeMap<String, String>,
    #[serde(rename = "lastUpdateTime", default, deserialize_with = "deserialize_wire_time")]
    pub last_update_time: Option<DateTime<Utc>>,
}

impl From<ConfigurationResponse> for ConfigurationSnapshot {
    fn from(resp: ConfigurationResponse) -> Self {
        ConfigurationSnapshot::new(resp.data, resp.last_update_time)
    }
}

/// Reads an RFC 3339 timestamp, mapping `null` and the zero time
/// (`0001-01-01T00:00:00Z`) to `None`.
pub fn deserialize_wire_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(value.filter(|t| t.year() > 1))
}

fn deserialize_null_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<BTreeMap<String, String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
