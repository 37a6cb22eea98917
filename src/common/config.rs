use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;

pub const DEFAULT_NODE_PORT: u16 = 9081;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    File,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default)]
    pub node_ip: String,
    #[serde(default = "default_node_port")]
    pub node_port: u16,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub node_tag: String,
    #[serde(default)]
    pub coordinator_host: String,

    #[serde(default = "default_conf_dir")]
    pub conf_dir: PathBuf,
    #[serde(default = "default_global_conf_file")]
    pub global_conf_file: String,

    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_meta_store_type")]
    pub meta_store_type: StorageType,
    #[serde(default = "default_meta_store_file_dir")]
    pub meta_store_file_dir: PathBuf,
    #[serde(default)]
    pub meta_store_redis_urls: Option<String>,

    #[serde(default = "default_true")]
    pub advance_watermark_on_partial_failure: bool,
}

fn default_node_port() -> u16 {
    DEFAULT_NODE_PORT
}

fn default_conf_dir() -> PathBuf {
    PathBuf::from("./etc")
}

fn default_global_conf_file() -> String {
    "kuiper.yaml".to_string()
}

fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_meta_store_type() -> StorageType {
    StorageType::File
}

fn default_meta_store_file_dir() -> PathBuf {
    PathBuf::from("./data/meta")
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Loads the agent configuration from the process environment, seeding it
/// from a dotenv file first when one is present.
pub fn load_agent_config(env_file: Option<&str>) -> Result<AgentConfig> {
    match env_file {
        Some(path) => {
            dotenv::from_path(path)?;
        }
        None => {
            // a missing .env is the normal case
            dotenv::dotenv().ok();
        }
    }
    build_agent_config(None)
}

/// Builds the configuration from an explicit variable map instead of the
/// process environment.
pub fn load_agent_config_from_map(vars: HashMap<String, String>) -> Result<AgentConfig> {
    build_agent_config(Some(vars))
}

fn build_agent_config(vars: Option<HashMap<String, String>>) -> Result<AgentConfig> {
    let environment = config::Environment::default()
        .try_parsing(true)
        .source(vars);
    let config = config::Config::builder()
        .add_source(environment)
        .build()?
        .try_deserialize::<AgentConfig>()?;
    log::debug!("Loaded agent config: {:?}", config);
    Ok(config)
}
