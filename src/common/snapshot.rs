use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which the coordinator ships the global document.
pub const GLOBAL_SECTION: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfType {
    Global,
    Source,
    Sink,
}

impl ConfType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfType::Global => "global",
            ConfType::Source => "source",
            ConfType::Sink => "sink",
        }
    }
}

impl fmt::Display for ConfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin families that are reconciled incrementally after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Source,
    Sink,
}

impl PluginKind {
    pub const ALL: [PluginKind; 2] = [PluginKind::Source, PluginKind::Sink];

    pub fn conf_type(&self) -> ConfType {
        match self {
            PluginKind::Source => ConfType::Source,
            PluginKind::Sink => ConfType::Sink,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Source => "sources",
            PluginKind::Sink => "sinks",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable bundle of raw plugin bodies as served by the coordinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationSnapshot {
    pub data: BTreeMap<String, String>,
    pub last_update_time: Option<DateTime<Utc>>,
}

impl ConfigurationSnapshot {
    pub fn new(data: BTreeMap<String, String>, last_update_time: Option<DateTime<Utc>>) -> Self {
        Self {
            data,
            last_update_time,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    pub fn is_newer_than(&self, other: &ConfigurationSnapshot) -> bool {
        is_newer(self.last_update_time, other.last_update_time)
    }
}

/// `candidate` is strictly after `current`. A missing candidate is never
/// newer; any candidate is newer than a missing current.
pub fn is_newer(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(c), Some(cur)) => c > cur,
    }
}

/// Plugin names become file names on disk, so they must be a single plain
/// path component.
pub fn validate_plugin_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        anyhow::bail!("invalid plugin name {:?}: must be a single path component", name);
    }
    Ok(())
}
