use crate::common::snapshot::PluginKind;
use crate::storage::redis::redis_client::RedisClient;
use crate::traits::meta_store::MetaStore;
use anyhow::Result;
use std::collections::BTreeMap;

/// One hash per plugin and locale, fields are configuration keys.
pub struct RedisMetaStore {
    client: RedisClient,
}

impl RedisMetaStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

pub fn plugin_hash_key(kind: PluginKind, plugin: &str, locale: &str) -> String {
    format!("conf:{}:{}:{}", kind.as_str(), plugin, locale)
}

impl MetaStore for RedisMetaStore {
    async fn add_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str, value: &[u8]) -> Result<()> {
        let hash_key = plugin_hash_key(kind, plugin, locale);
        self.client.hset(&hash_key, key, value).await.map_err(|e| {
            log::error!("Failed to set {} in Redis: {}", hash_key, e);
            e
        })
    }

    async fn del_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str) -> Result<()> {
        let hash_key = plugin_hash_key(kind, plugin, locale);
        let removed = self.client.hdel(&hash_key, key).await?;
        if removed == 0 {
            log::debug!("Key {} was not present in {}", key, hash_key);
        }
        Ok(())
    }

    async fn clear_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<()> {
        let hash_key = plugin_hash_key(kind, plugin, locale);
        self.client.del(&hash_key).await?;
        log::info!("Cleared {}", hash_key);
        Ok(())
    }

    async fn get_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let hash_key = plugin_hash_key(kind, plugin, locale);
        Ok(self.client.hgetall(&hash_key).await?.into_iter().collect())
    }
}
