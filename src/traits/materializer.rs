use anyhow::Result;
use std::collections::BTreeMap;

/// Writes the startup snapshots where the processing engine reads them.
pub trait Materializer {
    fn write_snapshot(&self, global_body: &str, source_bodies: &BTreeMap<String, String>) -> Result<()>;
}
