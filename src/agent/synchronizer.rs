use std::sync::Arc;
use tokio::sync::Mutex;

use crate::common::diff::{FieldDiff, PluginConfigDiff, PluginFields, encode_field_value, parse_plugin_body};
use crate::common::error::AgentError;
use crate::common::node::RegisteredNode;
use crate::common::response::ConfigurationRequest;
use crate::common::snapshot::{ConfigurationSnapshot, PluginKind};
use crate::traits::coordinator_client::CoordinatorClient;
use crate::traits::meta_store::MetaStore;

/// Locale every configuration key is registered under.
pub const DEFAULT_LOCALE: &str = "en_US";

/// What one diff application did to the metadata store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub added_keys: usize,
    pub deleted_keys: usize,
    pub cleared_plugins: usize,
    pub skipped_plugins: usize,
    pub failed_ops: usize,
}

impl ApplyReport {
    pub fn has_failures(&self) -> bool {
        self.skipped_plugins > 0 || self.failed_ops > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another reconciliation of the same kind holds the snapshot.
    InFlight,
    /// The loaded snapshot is not newer than the held one.
    Stale,
    /// Diff applied, held snapshot swapped and watermark advanced.
    Applied(ApplyReport),
    /// Diff applied with failures; snapshot and watermark left untouched so
    /// the next tick retries.
    Deferred(ApplyReport),
}

/// Keeps the metadata store in line with the coordinator's snapshots. Each
/// plugin kind holds its own snapshot behind its own lock, so at most one
/// reconciliation per kind runs at a time.
pub struct Synchronizer<C, S> {
    client: Arc<C>,
    meta_store: Arc<S>,
    node: Arc<RegisteredNode>,
    sources: Mutex<ConfigurationSnapshot>,
    sinks: Mutex<ConfigurationSnapshot>,
    advance_on_partial_failure: bool,
}

impl<C, S> Synchronizer<C, S>
where
    C: CoordinatorClient,
    S: MetaStore,
{
    pub fn new(
        client: Arc<C>,
        meta_store: Arc<S>,
        node: Arc<RegisteredNode>,
        initial_sources: ConfigurationSnapshot,
    ) -> Self {
        Self {
            client,
            meta_store,
            node,
            sources: Mutex::new(initial_sources),
            sinks: Mutex::new(ConfigurationSnapshot::default()),
            advance_on_partial_failure: true,
        }
    }

    pub fn with_partial_failure_policy(mut self, advance_on_partial_failure: bool) -> Self {
        self.advance_on_partial_failure = advance_on_partial_failure;
        self
    }

    pub fn node(&self) -> &Arc<RegisteredNode> {
        &self.node
    }

    fn slot(&self, kind: PluginKind) -> &Mutex<ConfigurationSnapshot> {
        match kind {
            PluginKind::Source => &self.sources,
            PluginKind::Sink => &self.sinks,
        }
    }

    /// Copy of the currently held snapshot for `kind`.
    pub async fn held(&self, kind: PluginKind) -> ConfigurationSnapshot {
        self.slot(kind).lock().await.clone()
    }

    /// Reloads the snapshot for `kind` and applies whatever changed since the
    /// held one. Only the load itself can fail; per-plugin and per-key
    /// failures are counted in the report.
    pub async fn reconcile(&self, kind: PluginKind) -> Result<ReconcileOutcome, AgentError> {
        let Ok(mut held) = self.slot(kind).try_lock() else {
            log::debug!("Reconciliation of {} already in flight", kind);
            return Ok(ReconcileOutcome::InFlight);
        };

        log::info!("Start to reload {}", kind);
        let request = ConfigurationRequest {
            worker_id: self.node.worker_id,
            conf_type: kind.conf_type(),
        };
        let fresh = self.client.load_configuration(&request).await?;

        if !fresh.is_newer_than(&held) {
            log::info!(
                "Loaded {} snapshot ({:?}) is not newer than held ({:?}), skipping",
                kind,
                fresh.last_update_time,
                held.last_update_time
            );
            return Ok(ReconcileOutcome::Stale);
        }

        let diff = PluginConfigDiff::between(&held, &fresh);
        log::info!(
            "{} changed: {} added, {} modified, {} deleted",
            kind,
            diff.added.len(),
            diff.modified.len(),
            diff.deleted.len()
        );
        let report = apply_diff(self.meta_store.as_ref(), kind, &diff, &held, &fresh).await;

        if report.has_failures() {
            log::warn!("Reconciliation of {} finished with failures: {:?}", kind, report);
            if !self.advance_on_partial_failure {
                return Ok(ReconcileOutcome::Deferred(report));
            }
        }

        let update_time = fresh.last_update_time;
        *held = fresh;
        self.node.advance_watermark(kind, update_time).await;
        log::info!("End reload {}, watermark now {:?}", kind, update_time);
        Ok(ReconcileOutcome::Applied(report))
    }
}

/// Applies `diff` to the store key by key. Nothing here aborts the run: a
/// plugin whose body does not parse is skipped and a failing key is counted.
pub async fn apply_diff<S>(
    store: &S,
    kind: PluginKind,
    diff: &PluginConfigDiff,
    old: &ConfigurationSnapshot,
    new: &ConfigurationSnapshot,
) -> ApplyReport
where
    S: MetaStore,
{
    let mut report = ApplyReport::default();

    for plugin in &diff.added {
        log::info!("Add {} plugin: {}", kind, plugin);
        let Some(fields) = parse_or_skip(kind, plugin, new.get(plugin), &mut report) else {
            continue;
        };
        for (key, value) in &fields {
            add_key(store, kind, plugin, key, value, &mut report).await;
        }
    }

    for plugin in &diff.modified {
        log::info!("Modify {} plugin: {}", kind, plugin);
        let Some(old_fields) = parse_or_skip(kind, plugin, old.get(plugin), &mut report) else {
            continue;
        };
        let Some(new_fields) = parse_or_skip(kind, plugin, new.get(plugin), &mut report) else {
            continue;
        };
        let fields = FieldDiff::between(&old_fields, &new_fields);
        for (key, value) in &fields.added {
            add_key(store, kind, plugin, key, value, &mut report).await;
        }
        for (key, (_, value)) in &fields.modified {
            log::info!("Modify {} {}, key {}", kind, plugin, key);
            delete_key(store, kind, plugin, key, &mut report).await;
            add_key(store, kind, plugin, key, value, &mut report).await;
        }
        for key in &fields.deleted {
            delete_key(store, kind, plugin, key, &mut report).await;
        }
    }

    for plugin in &diff.deleted {
        log::info!("Delete {} plugin: {}", kind, plugin);
        match store.clear_plugin(kind, plugin, DEFAULT_LOCALE).await {
            Ok(()) => report.cleared_plugins += 1,
            Err(e) => {
                log::error!("Clear {} {} error {}", kind, plugin, e);
                report.failed_ops += 1;
            }
        }
    }

    report
}

fn parse_or_skip(
    kind: PluginKind,
    plugin: &str,
    body: Option<&str>,
    report: &mut ApplyReport,
) -> Option<PluginFields> {
    match parse_plugin_body(body.unwrap_or_default()) {
        Ok(fields) => Some(fields),
        Err(e) => {
            log::error!("Unmarshal {} {} error {}", kind, plugin, e);
            report.skipped_plugins += 1;
            None
        }
    }
}

async fn add_key<S>(
    store: &S,
    kind: PluginKind,
    plugin: &str,
    key: &str,
    value: &serde_yaml::Value,
    report: &mut ApplyReport,
) where
    S: MetaStore,
{
    let encoded = match encode_field_value(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            log::error!("Encode {} {} key {} error {}", kind, plugin, key, e);
            report.failed_ops += 1;
            return;
        }
    };
    match store.add_conf_key(kind, plugin, key, DEFAULT_LOCALE, &encoded).await {
        Ok(()) => report.added_keys += 1,
        Err(e) => {
            log::error!("Add {} {} key {} error {}", kind, plugin, key, e);
            report.failed_ops += 1;
        }
    }
}

async fn delete_key<S>(store: &S, kind: PluginKind, plugin: &str, key: &str, report: &mut ApplyReport)
where
    S: MetaStore,
{
    match store.del_conf_key(kind, plugin, key, DEFAULT_LOCALE).await {
        Ok(()) => report.deleted_keys += 1,
        Err(e) => {
            log::error!("Delete {} {} key {} error {}", kind, plugin, key, e);
            report.failed_ops += 1;
        }
    }
}
