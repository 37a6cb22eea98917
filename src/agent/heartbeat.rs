use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::agent::synchronizer::{ReconcileOutcome, Synchronizer};
use crate::common::node::RegisteredNode;
use crate::common::response::{HeartbeatRequest, HeartbeatStatus};
use crate::common::snapshot::{PluginKind, is_newer};
use crate::traits::coordinator_client::CoordinatorClient;
use crate::traits::meta_store::MetaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Starting,
    Running,
    Terminated,
}

/// Why the heartbeat loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The host cancelled the loop.
    Stopped,
    /// The coordinator told this node to terminate.
    Killed,
}

enum TickOutcome {
    Continue,
    Kill,
}

pub struct HeartbeatService<C, S> {
    client: Arc<C>,
    synchronizer: Arc<Synchronizer<C, S>>,
    node: Arc<RegisteredNode>,
    interval: Duration,
    shutdown_token: CancellationToken,
    state: watch::Sender<HeartbeatState>,
    in_flight: HashMap<PluginKind, JoinHandle<()>>,
}

impl<C, S> HeartbeatService<C, S>
where
    C: CoordinatorClient + Send + Sync + 'static,
    S: MetaStore + Send + Sync + 'static,
{
    pub fn new(
        client: Arc<C>,
        synchronizer: Arc<Synchronizer<C, S>>,
        interval: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        let node = synchronizer.node().clone();
        Self {
            client,
            synchronizer,
            node,
            interval,
            shutdown_token,
            state: watch::Sender::new(HeartbeatState::Starting),
            in_flight: HashMap::new(),
        }
    }

    /// Follows the loop through `Starting -> Running -> Terminated`.
    pub fn subscribe_state(&self) -> watch::Receiver<HeartbeatState> {
        self.state.subscribe()
    }

    /// Ticks until the token is cancelled or the coordinator sends a kill.
    /// Reconciliations still running at that point are awaited before
    /// returning; nothing new is started.
    pub async fn run(mut self) -> HeartbeatExit {
        log::info!(
            "Starting heartbeat for worker {} every {:?}",
            self.node.worker_id,
            self.interval
        );
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state.send_replace(HeartbeatState::Running);
        let shutdown_token = self.shutdown_token.clone();

        let exit = loop {
            tokio::select! {
                biased;
                _ = shutdown_token.cancelled() => {
                    log::info!("Heartbeat service shutting down");
                    break HeartbeatExit::Stopped;
                }
                _ = ticker.tick() => {
                    if let TickOutcome::Kill = self.tick().await {
                        log::warn!("Heartbeat killed, worker {} exits", self.node.worker_id);
                        break HeartbeatExit::Killed;
                    }
                }
            }
        };

        self.drain().await;
        self.state.send_replace(HeartbeatState::Terminated);
        exit
    }

    async fn tick(&mut self) -> TickOutcome {
        let watermarks = self.node.watermarks().await;
        let request = HeartbeatRequest {
            worker_id: self.node.worker_id,
            ip: self.node.identity.ip.clone(),
            port: self.node.identity.port,
            last_sources_time: watermarks.last_sources_time,
        };
        let status = match self.client.heartbeat(&request).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Heartbeat error {}", e);
                return TickOutcome::Continue;
            }
        };
        log::debug!("Heartbeat status {:?}", status);
        if status.kill {
            return TickOutcome::Kill;
        }

        for kind in PluginKind::ALL {
            if is_newer(remote_watermark(&status, kind), watermarks.get(kind)) {
                log::info!("{} changed, need reload", kind);
                self.dispatch(kind);
            }
        }
        TickOutcome::Continue
    }

    /// Starts a reconciliation for `kind` unless one is still running.
    fn dispatch(&mut self, kind: PluginKind) {
        if let Some(handle) = self.in_flight.get(&kind) {
            if !handle.is_finished() {
                log::debug!("Reconciliation of {} still running, coalescing", kind);
                return;
            }
        }
        let synchronizer = self.synchronizer.clone();
        let handle = tokio::spawn(async move {
            match synchronizer.reconcile(kind).await {
                Ok(ReconcileOutcome::Applied(report)) => {
                    log::info!("Reconciled {}: {:?}", kind, report)
                }
                Ok(outcome) => log::debug!("Reconcile {} outcome {:?}", kind, outcome),
                Err(e) => log::error!("Reload {} error {}", kind, e),
            }
        });
        self.in_flight.insert(kind, handle);
    }

    async fn drain(&mut self) {
        for (kind, handle) in self.in_flight.drain() {
            if let Err(e) = handle.await {
                log::error!("Reconciliation of {} panicked: {}", kind, e);
            }
        }
    }
}

fn remote_watermark(status: &HeartbeatStatus, kind: PluginKind) -> Option<chrono::DateTime<chrono::Utc>> {
    match kind {
        PluginKind::Source => status.last_sources_time,
        PluginKind::Sink => status.last_sinks_time,
    }
}
