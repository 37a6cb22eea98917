use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::common::snapshot::ConfigurationSnapshot;

/// Parsed body of one plugin: configuration key to value.
pub type PluginFields = BTreeMap<String, Value>;

/// Top-level difference between two snapshots, by plugin name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfigDiff {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl PluginConfigDiff {
    /// Partitions the union of both key sets. Bodies are compared as raw
    /// strings; unchanged plugins land in no partition.
    pub fn between(old: &ConfigurationSnapshot, new: &ConfigurationSnapshot) -> Self {
        let mut diff = PluginConfigDiff::default();
        for (name, body) in &new.data {
            match old.data.get(name) {
                None => {
                    diff.added.insert(name.clone());
                }
                Some(old_body) if old_body != body => {
                    diff.modified.insert(name.clone());
                }
                Some(_) => {}
            }
        }
        for name in old.data.keys() {
            if !new.data.contains_key(name) {
                diff.deleted.insert(name.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Key-level difference inside one modified plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff {
    pub added: BTreeMap<String, Value>,
    /// key -> (old, new)
    pub modified: BTreeMap<String, (Value, Value)>,
    pub deleted: BTreeSet<String>,
}

impl FieldDiff {
    pub fn between(old: &PluginFields, new: &PluginFields) -> Self {
        let mut diff = FieldDiff::default();
        for (key, value) in new {
            match old.get(key) {
                None => {
                    diff.added.insert(key.clone(), value.clone());
                }
                Some(old_value) if differs(old_value, value) => {
                    diff.modified
                        .insert(key.clone(), (old_value.clone(), value.clone()));
                }
                Some(_) => {}
            }
        }
        for key in old.keys() {
            if !new.contains_key(key) {
                diff.deleted.insert(key.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

// Values that cannot be rendered as JSON never compare equal to anything,
// so they always take the delete-then-add path and surface the error there.
fn differs(old: &Value, new: &Value) -> bool {
    match (serde_json::to_string(old), serde_json::to_string(new)) {
        (Ok(old), Ok(new)) => old != new,
        _ => true,
    }
}

/// Encodes a field value the way the metadata store expects it.
pub fn encode_field_value(value: &Value) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Parses a raw plugin body. Blank and `null` bodies are empty maps.
pub fn parse_plugin_body(body: &str) -> anyhow::Result<PluginFields> {
    if body.trim().is_empty() {
        return Ok(PluginFields::new());
    }
    let parsed: Option<PluginFields> = serde_yaml::from_str(body)?;
    Ok(parsed.unwrap_or_default())
}
