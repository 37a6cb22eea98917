use crate::common::snapshot::PluginKind;
use crate::storage::file::file_meta_store::FileMetaStore;
use crate::storage::redis::redis_meta_store::RedisMetaStore;
use crate::traits::meta_store::MetaStore;
use anyhow::Result;
use std::collections::BTreeMap;

pub enum MetaStoreImpl {
    File(FileMetaStore),
    Redis(RedisMetaStore),
}

impl MetaStore for MetaStoreImpl {
    async fn add_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str, value: &[u8]) -> Result<()> {
        match self {
            MetaStoreImpl::File(f) => f.add_conf_key(kind, plugin, key, locale, value).await,
            MetaStoreImpl::Redis(r) => r.add_conf_key(kind, plugin, key, locale, value).await,
        }
    }

    async fn del_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str) -> Result<()> {
        match self {
            MetaStoreImpl::File(f) => f.del_conf_key(kind, plugin, key, locale).await,
            MetaStoreImpl::Redis(r) => r.del_conf_key(kind, plugin, key, locale).await,
        }
    }

    async fn clear_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<()> {
        match self {
            MetaStoreImpl::File(f) => f.clear_plugin(kind, plugin, locale).await,
            MetaStoreImpl::Redis(r) => r.clear_plugin(kind, plugin, locale).await,
        }
    }

    async fn get_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        match self {
            MetaStoreImpl::File(f) => f.get_plugin(kind, plugin, locale).await,
            MetaStoreImpl::Redis(r) => r.get_plugin(kind, plugin, locale).await,
        }
    }
}
