use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::common::snapshot::{PluginKind, is_newer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub name: String,
    pub tag: String,
    pub ip: String,
    pub port: u16,
    pub coordinator_host: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermarks {
    pub last_sources_time: Option<DateTime<Utc>>,
    pub last_sinks_time: Option<DateTime<Utc>>,
}

impl Watermarks {
    pub fn get(&self, kind: PluginKind) -> Option<DateTime<Utc>> {
        match kind {
            PluginKind::Source => self.last_sources_time,
            PluginKind::Sink => self.last_sinks_time,
        }
    }

    fn slot(&mut self, kind: PluginKind) -> &mut Option<DateTime<Utc>> {
        match kind {
            PluginKind::Source => &mut self.last_sources_time,
            PluginKind::Sink => &mut self.last_sinks_time,
        }
    }
}

/// A node the coordinator has accepted. The worker id never changes; the
/// watermarks only move forward.
#[derive(Debug)]
pub struct RegisteredNode {
    pub identity: NodeIdentity,
    pub worker_id: i32,
    watermarks: RwLock<Watermarks>,
}

impl RegisteredNode {
    pub fn new(identity: NodeIdentity, worker_id: i32) -> Self {
        Self {
            identity,
            worker_id,
            watermarks: RwLock::new(Watermarks::default()),
        }
    }

    pub async fn watermarks(&self) -> Watermarks {
        *self.watermarks.read().await
    }

    pub async fn watermark(&self, kind: PluginKind) -> Option<DateTime<Utc>> {
        self.watermarks.read().await.get(kind)
    }

    /// Moves the watermark for `kind` to `time` if that is strictly newer.
    /// Returns whether it moved.
    pub async fn advance_watermark(&self, kind: PluginKind, time: Option<DateTime<Utc>>) -> bool {
        let mut guard = self.watermarks.write().await;
        let slot = guard.slot(kind);
        if is_newer(time, *slot) {
            *slot = time;
            true
        } else {
            false
        }
    }
}
