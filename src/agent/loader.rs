use crate::common::config::{AgentConfig, StorageType};
use crate::common::error::AgentError;
use crate::common::node::RegisteredNode;
use crate::common::response::ConfigurationRequest;
use crate::common::snapshot::{ConfType, ConfigurationSnapshot, GLOBAL_SECTION};
use crate::storage::{
    file::file_meta_store::FileMetaStore,
    meta_store_impl::MetaStoreImpl,
    redis::redis_client::RedisClient,
    redis::redis_meta_store::RedisMetaStore,
};
use crate::traits::coordinator_client::CoordinatorClient;
use anyhow::Result;
use redis::cluster::ClusterClient;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn load_meta_store(agent_config: &AgentConfig) -> Result<MetaStoreImpl> {
    let meta_store_load = match &agent_config.meta_store_type {
        StorageType::File => {
            log::debug!("Using File meta store at {:?}", agent_config.meta_store_file_dir);
            MetaStoreImpl::File(FileMetaStore::new(&agent_config.meta_store_file_dir))
        }
        StorageType::Redis => {
            log::debug!("Using Redis meta store");
            let redis_urls = agent_config
                .meta_store_redis_urls
                .clone()
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<String>>();
            let redis_client: RedisClient = match redis_urls.as_slice() {
                [] => return Err(anyhow::anyhow!("Redis urls not configured")),
                [single] => {
                    log::debug!("Using single Redis instance at: {}", single);
                    let client = redis::Client::open(single.as_str())?;
                    let conn = client.get_multiplexed_async_connection().await?;
                    RedisClient::new(false, None, Some(Arc::new(Mutex::new(conn))))
                }
                _ => {
                    log::debug!("Using Redis Cluster with URLs: {:?}", redis_urls);
                    let client = ClusterClient::new(redis_urls)?;
                    let conn = client.get_async_connection().await?;
                    RedisClient::new(true, Some(Arc::new(Mutex::new(conn))), None)
                }
            };
            MetaStoreImpl::Redis(RedisMetaStore::new(redis_client))
        }
    };
    Ok(meta_store_load)
}

pub async fn load_configuration<C>(
    client: &C,
    node: &RegisteredNode,
    conf_type: ConfType,
) -> Result<ConfigurationSnapshot, AgentError>
where
    C: CoordinatorClient,
{
    log::info!("Start to load {} yaml configuration", conf_type);
    let request = ConfigurationRequest {
        worker_id: node.worker_id,
        conf_type,
    };
    client.load_configuration(&request).await
}

/// Fetches the global and source snapshots concurrently.
pub async fn load_initial_configuration<C>(
    client: &C,
    node: &RegisteredNode,
) -> Result<(ConfigurationSnapshot, ConfigurationSnapshot), AgentError>
where
    C: CoordinatorClient,
{
    tokio::try_join!(
        load_configuration(client, node, ConfType::Global),
        load_configuration(client, node, ConfType::Source),
    )
}

/// The global document, which must be present and non-blank.
pub fn global_body(snapshot: &ConfigurationSnapshot) -> Result<&str, AgentError> {
    match snapshot.get(GLOBAL_SECTION) {
        Some(body) if !body.trim().is_empty() => Ok(body),
        _ => Err(AgentError::EmptyGlobalConfig),
    }
}
