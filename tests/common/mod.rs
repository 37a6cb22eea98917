#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use edge_node_agent::common::error::AgentError;
use edge_node_agent::common::node::NodeIdentity;
use edge_node_agent::common::response::{
    ConfigurationRequest, HEARTBEAT_PATH, HeartbeatRequest, HeartbeatStatus,
    LOAD_CONFIGURATION_PATH, REGISTER_PATH, RegisterRequest, RegisterResponse, UnregisterRequest,
};
use edge_node_agent::common::snapshot::{ConfType, ConfigurationSnapshot, PluginKind};
use edge_node_agent::traits::coordinator_client::CoordinatorClient;
use edge_node_agent::traits::meta_store::MetaStore;

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn snapshot(entries: &[(&str, &str)], at: Option<DateTime<Utc>>) -> ConfigurationSnapshot {
    let data = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>();
    ConfigurationSnapshot::new(data, at)
}

pub fn identity() -> NodeIdentity {
    NodeIdentity {
        name: "n1".to_string(),
        tag: String::new(),
        ip: "10.0.0.1".to_string(),
        port: 9081,
        coordinator_host: "127.0.0.1:1".to_string(),
    }
}

/// In-memory coordinator with scripted answers and a record of every call.
pub struct FakeCoordinator {
    pub worker_id: i32,
    register_failure: Mutex<Option<(i32, String)>>,
    snapshots: Mutex<HashMap<ConfType, ConfigurationSnapshot>>,
    load_failures: Mutex<usize>,
    load_delay: Mutex<Option<Duration>>,
    heartbeat_script: Mutex<VecDeque<Result<HeartbeatStatus, String>>>,
    default_status: Mutex<HeartbeatStatus>,
    pub registrations: Mutex<Vec<RegisterRequest>>,
    pub heartbeats: Mutex<Vec<HeartbeatRequest>>,
    pub loads: Mutex<Vec<ConfType>>,
    pub unregistered: Mutex<Vec<i32>>,
}

impl FakeCoordinator {
    pub fn new(worker_id: i32) -> Self {
        Self {
            worker_id,
            register_failure: Mutex::new(None),
            snapshots: Mutex::new(HashMap::new()),
            load_failures: Mutex::new(0),
            load_delay: Mutex::new(None),
            heartbeat_script: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(HeartbeatStatus::default()),
            registrations: Mutex::new(Vec::new()),
            heartbeats: Mutex::new(Vec::new()),
            loads: Mutex::new(Vec::new()),
            unregistered: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_registration(&self, code: i32, message: &str) {
        *self.register_failure.lock().unwrap() = Some((code, message.to_string()));
    }

    pub fn set_snapshot(&self, conf_type: ConfType, snapshot: ConfigurationSnapshot) {
        self.snapshots.lock().unwrap().insert(conf_type, snapshot);
    }

    pub fn fail_next_loads(&self, count: usize) {
        *self.load_failures.lock().unwrap() = count;
    }

    pub fn delay_loads(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_heartbeat(&self, status: HeartbeatStatus) {
        self.heartbeat_script.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_heartbeat_error(&self, message: &str) {
        self.heartbeat_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Answer used once the script is exhausted.
    pub fn set_default_status(&self, status: HeartbeatStatus) {
        *self.default_status.lock().unwrap() = status;
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeats.lock().unwrap().len()
    }

    pub fn load_count(&self, conf_type: ConfType) -> usize {
        self.loads
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == conf_type)
            .count()
    }
}

impl CoordinatorClient for FakeCoordinator {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AgentError> {
        self.registrations.lock().unwrap().push(request.clone());
        if let Some((code, message)) = self.register_failure.lock().unwrap().clone() {
            return Err(AgentError::Api {
                endpoint: REGISTER_PATH,
                code,
                message,
            });
        }
        Ok(RegisterResponse {
            worker_id: self.worker_id,
        })
    }

    async fn unregister(&self, request: &UnregisterRequest) -> Result<(), AgentError> {
        self.unregistered.lock().unwrap().push(request.worker_id);
        Ok(())
    }

    async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatStatus, AgentError> {
        self.heartbeats.lock().unwrap().push(request.clone());
        let next = self.heartbeat_script.lock().unwrap().pop_front();
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(AgentError::Api {
                endpoint: HEARTBEAT_PATH,
                code: 1,
                message,
            }),
            None => Ok(self.default_status.lock().unwrap().clone()),
        }
    }

    async fn load_configuration(&self, request: &ConfigurationRequest) -> Result<ConfigurationSnapshot, AgentError> {
        self.loads.lock().unwrap().push(request.conf_type);
        let delay = *self.load_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut failures = self.load_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AgentError::Api {
                    endpoint: LOAD_CONFIGURATION_PATH,
                    code: 500,
                    message: "load failed".to_string(),
                });
            }
        }
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .get(&request.conf_type)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Add { plugin: String, key: String, value: String },
    Del { plugin: String, key: String },
    Clear { plugin: String },
}

/// Metadata store kept in memory, recording every call. Keys listed in
/// `failing_keys` reject adds.
#[derive(Default)]
pub struct MemoryMetaStore {
    plugins: Mutex<BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>>,
    pub calls: Mutex<Vec<StoreCall>>,
    failing_keys: Mutex<BTreeSet<String>>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn heal_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().remove(key);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Full contents, for state comparisons.
    pub fn dump(&self) -> BTreeMap<(String, String), BTreeMap<String, Vec<u8>>> {
        self.plugins.lock().unwrap().clone()
    }

    pub fn value(&self, kind: PluginKind, plugin: &str, key: &str) -> Option<String> {
        self.plugins
            .lock()
            .unwrap()
            .get(&(kind.as_str().to_string(), plugin.to_string()))
            .and_then(|keys| keys.get(key))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

impl MetaStore for MemoryMetaStore {
    async fn add_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, _locale: &str, value: &[u8]) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(StoreCall::Add {
            plugin: plugin.to_string(),
            key: key.to_string(),
            value: String::from_utf8_lossy(value).into_owned(),
        });
        if self.failing_keys.lock().unwrap().contains(key) {
            anyhow::bail!("key {} rejected", key);
        }
        self.plugins
            .lock()
            .unwrap()
            .entry((kind.as_str().to_string(), plugin.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn del_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, _locale: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(StoreCall::Del {
            plugin: plugin.to_string(),
            key: key.to_string(),
        });
        let mut plugins = self.plugins.lock().unwrap();
        let id = (kind.as_str().to_string(), plugin.to_string());
        if let Some(keys) = plugins.get_mut(&id) {
            keys.remove(key);
            if keys.is_empty() {
                plugins.remove(&id);
            }
        }
        Ok(())
    }

    async fn clear_plugin(&self, kind: PluginKind, plugin: &str, _locale: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(StoreCall::Clear {
            plugin: plugin.to_string(),
        });
        self.plugins
            .lock()
            .unwrap()
            .remove(&(kind.as_str().to_string(), plugin.to_string()));
        Ok(())
    }

    async fn get_plugin(&self, kind: PluginKind, plugin: &str, _locale: &str) -> anyhow::Result<BTreeMap<String, Vec<u8>>> {
        Ok(self
            .plugins
            .lock()
            .unwrap()
            .get(&(kind.as_str().to_string(), plugin.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
