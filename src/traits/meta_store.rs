use crate::common::snapshot::PluginKind;
use anyhow::Result;
use std::collections::BTreeMap;

/// Per-plugin configuration keys consumed by the processing engine. Every
/// operation touches one plugin and is independent of the others.
#[trait_variant::make(MetaStore: Send)]
pub trait UnsendMetaStore {
    async fn add_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str, value: &[u8]) -> Result<()>;
    async fn del_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str) -> Result<()>;
    async fn clear_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<()>;
    async fn get_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<BTreeMap<String, Vec<u8>>>;
}
