use crate::common::snapshot::{PluginKind, validate_plugin_name};
use crate::traits::meta_store::MetaStore;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{ErrorKind::NotFound, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// locale -> key -> value, one document per plugin.
type PluginDocument = BTreeMap<String, BTreeMap<String, Value>>;

/// Keeps each plugin's keys in `<root>/<kind>/<plugin>.json`.
pub struct FileMetaStore {
    root_dir: PathBuf,
}

impl FileMetaStore {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_owned(),
        }
    }

    fn plugin_path(&self, kind: PluginKind, plugin: &str) -> Result<PathBuf> {
        validate_plugin_name(plugin).with_context(|| format!("cannot store {} plugin", kind))?;
        Ok(self.root_dir.join(kind.as_str()).join(format!("{}.json", plugin)))
    }

    /// Runs `update` on the plugin document under an exclusive file lock and
    /// writes the result back. An emptied document leaves an empty file.
    fn update_document<F>(&self, kind: PluginKind, plugin: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut PluginDocument),
    {
        let path = self.plugin_path(kind, plugin)?;
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;

        let result = (|| -> Result<()> {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let mut document: PluginDocument = if contents.trim().is_empty() {
                PluginDocument::new()
            } else {
                serde_json::from_str(&contents)?
            };

            update(&mut document);
            document.retain(|_, keys| !keys.is_empty());

            // never unlink here: writers blocked on this lock hold the same inode
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            if !document.is_empty() {
                let json = serde_json::to_string_pretty(&document)?;
                file.write_all(json.as_bytes())?;
            }
            file.flush()?;
            Ok(())
        })();

        FileExt::unlock(&file)?;
        result
    }

    fn read_document(&self, kind: PluginKind, plugin: &str) -> Result<PluginDocument> {
        let mut file = match File::open(self.plugin_path(kind, plugin)?) {
            Ok(f) => f,
            Err(e) if e.kind() == NotFound => return Ok(PluginDocument::new()),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        FileExt::unlock(&file)?;
        read?;
        if contents.trim().is_empty() {
            return Ok(PluginDocument::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

impl MetaStore for FileMetaStore {
    async fn add_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str, value: &[u8]) -> Result<()> {
        let value: Value = serde_json::from_slice(value)?;
        self.update_document(kind, plugin, |document| {
            document
                .entry(locale.to_string())
                .or_default()
                .insert(key.to_string(), value);
        })?;
        log::debug!("Stored {} {} key {} ({})", kind, plugin, key, locale);
        Ok(())
    }

    async fn del_conf_key(&self, kind: PluginKind, plugin: &str, key: &str, locale: &str) -> Result<()> {
        if !self.plugin_path(kind, plugin)?.exists() {
            return Ok(());
        }
        self.update_document(kind, plugin, |document| {
            if let Some(keys) = document.get_mut(locale) {
                keys.remove(key);
            }
        })
    }

    async fn clear_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<()> {
        if !self.plugin_path(kind, plugin)?.exists() {
            return Ok(());
        }
        self.update_document(kind, plugin, |document| {
            document.remove(locale);
        })
    }

    async fn get_plugin(&self, kind: PluginKind, plugin: &str, locale: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let document = self.read_document(kind, plugin)?;
        let mut result = BTreeMap::new();
        if let Some(keys) = document.get(locale) {
            for (key, value) in keys {
                result.insert(key.clone(), serde_json::to_vec(value)?);
            }
        }
        Ok(result)
    }
}
