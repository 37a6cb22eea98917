use crate::common::snapshot::validate_plugin_name;
use crate::traits::materializer::Materializer;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all};
use std::io::ErrorKind::NotFound;
use std::path::{Path, PathBuf};

pub const SOURCES_DIR: &str = "sources";
pub const MQTT_PLUGIN: &str = "mqtt";
pub const MQTT_SOURCE_FILE: &str = "mqtt_source.yaml";

/// Lays the startup snapshots out under the engine's configuration directory.
pub struct FileMaterializer {
    conf_dir: PathBuf,
    global_file_name: String,
}

impl FileMaterializer {
    pub fn new(conf_dir: impl AsRef<Path>, global_file_name: impl Into<String>) -> Self {
        Self {
            conf_dir: conf_dir.as_ref().to_owned(),
            global_file_name: global_file_name.into(),
        }
    }

    pub fn global_path(&self) -> PathBuf {
        self.conf_dir.join(&self.global_file_name)
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.conf_dir.join(SOURCES_DIR)
    }

    /// `mqtt` lives next to the global file, everything else under `sources/`.
    pub fn source_path(&self, plugin: &str) -> Result<PathBuf> {
        validate_plugin_name(plugin).context("refusing to materialize source")?;
        if plugin == MQTT_PLUGIN {
            Ok(self.conf_dir.join(MQTT_SOURCE_FILE))
        } else {
            Ok(self.sources_dir().join(format!("{}.yaml", plugin)))
        }
    }

    /// Deletes every stale source file. A missing directory is fine; any
    /// other failure aborts so stale configuration cannot survive silently.
    pub fn clear_source_files(&self) -> Result<usize> {
        let mut removed = 0;
        match fs::remove_file(self.conf_dir.join(MQTT_SOURCE_FILE)) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == NotFound => {}
            Err(e) => return Err(e).context("failed to remove mqtt source file"),
        }
        removed += remove_yaml_files(&self.sources_dir())?;
        Ok(removed)
    }
}

fn remove_yaml_files(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("error walking the path {}", dir.display())),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            removed += remove_yaml_files(&path)?;
        } else if path.extension().is_some_and(|ext| ext == "yaml") {
            fs::remove_file(&path).with_context(|| format!("failed to remove file {}", path.display()))?;
            log::debug!("Deleted file: {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

impl Materializer for FileMaterializer {
    fn write_snapshot(&self, global_body: &str, source_bodies: &BTreeMap<String, String>) -> Result<()> {
        // resolve every target before touching the directory
        let targets = source_bodies
            .iter()
            .map(|(plugin, body)| -> Result<_> { Ok((plugin, self.source_path(plugin)?, body)) })
            .collect::<Result<Vec<_>>>()?;

        create_dir_all(&self.conf_dir)?;
        let global_path = self.global_path();
        log::info!("Writing global configuration to {}", global_path.display());
        fs::write(&global_path, global_body)
            .with_context(|| format!("failed to write {}", global_path.display()))?;

        let removed = self.clear_source_files()?;
        log::debug!("Removed {} stale source files", removed);
        create_dir_all(self.sources_dir())?;

        for (plugin, path, body) in targets {
            log::info!("Writing datasource {} to file {}", plugin, path.display());
            fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }
}
