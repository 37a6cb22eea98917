use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::agent::heartbeat::{HeartbeatExit, HeartbeatService};
use crate::agent::identity::resolve_identity;
use crate::agent::loader::{global_body, load_initial_configuration, load_meta_store};
use crate::agent::registration::{register, unregister};
use crate::agent::synchronizer::Synchronizer;
use crate::agent::transport::HttpCoordinatorClient;
use crate::common::config::{AgentConfig, load_agent_config};
use crate::common::node::{NodeIdentity, RegisteredNode};
use crate::common::snapshot::{ConfigurationSnapshot, PluginKind};
use crate::storage::file::file_materializer::FileMaterializer;
use crate::traits::coordinator_client::CoordinatorClient;
use crate::traits::materializer::Materializer;
use crate::traits::meta_store::MetaStore;

/// A registered node with its startup configuration on disk, ready to start
/// heartbeating.
pub struct CoordinatorAgent<C, S> {
    client: Arc<C>,
    node: Arc<RegisteredNode>,
    synchronizer: Arc<Synchronizer<C, S>>,
}

impl<C, S> CoordinatorAgent<C, S>
where
    C: CoordinatorClient + Send + Sync + 'static,
    S: MetaStore + Send + Sync + 'static,
{
    /// Registers the node, loads the global and source snapshots and writes
    /// them out. Every failure here is fatal.
    pub async fn init<M>(
        client: Arc<C>,
        meta_store: Arc<S>,
        materializer: &M,
        identity: NodeIdentity,
        advance_on_partial_failure: bool,
    ) -> Result<Self>
    where
        M: Materializer,
    {
        log::info!("Start to init coordinator agent");
        let node = Arc::new(register(client.as_ref(), identity).await?);

        let sources = match Self::materialize(client.as_ref(), &node, materializer).await {
            Ok(sources) => sources,
            Err(e) => {
                unregister(client.as_ref(), &node).await;
                return Err(e);
            }
        };

        node.advance_watermark(PluginKind::Source, sources.last_update_time).await;
        let synchronizer = Synchronizer::new(client.clone(), meta_store, node.clone(), sources)
            .with_partial_failure_policy(advance_on_partial_failure);

        Ok(Self {
            client,
            node,
            synchronizer: Arc::new(synchronizer),
        })
    }

    async fn materialize<M>(client: &C, node: &RegisteredNode, materializer: &M) -> Result<ConfigurationSnapshot>
    where
        M: Materializer,
    {
        let (global, sources) = load_initial_configuration(client, node).await?;
        let global_yaml = global_body(&global)?;
        materializer.write_snapshot(global_yaml, &sources.data)?;
        Ok(sources)
    }

    pub fn node(&self) -> &Arc<RegisteredNode> {
        &self.node
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer<C, S>> {
        &self.synchronizer
    }

    /// Heartbeats until `stop` resolves or the coordinator kills the node.
    /// On an external stop the node unregisters; after a kill it does not.
    pub async fn run<F>(self, interval: Duration, stop: F) -> HeartbeatExit
    where
        F: Future<Output = ()>,
    {
        let shutdown_token = CancellationToken::new();
        let service = HeartbeatService::new(
            self.client.clone(),
            self.synchronizer.clone(),
            interval,
            shutdown_token.clone(),
        );
        let mut heartbeat = tokio::spawn(service.run());

        let joined = tokio::select! {
            joined = &mut heartbeat => joined,
            _ = stop => {
                log::info!("Stop requested, waiting for heartbeat to drain");
                shutdown_token.cancel();
                heartbeat.await
            }
        };
        let exit = joined.unwrap_or_else(|e| {
            log::error!("Heartbeat task failed: {}", e);
            HeartbeatExit::Stopped
        });

        if exit == HeartbeatExit::Stopped {
            unregister(self.client.as_ref(), &self.node).await;
        }
        exit
    }
}

/// Bootstraps from the environment and runs until a signal or a kill.
pub async fn agent_start(env_file: Option<&str>) -> Result<HeartbeatExit> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting coordinator agent...");
    let agent_config: AgentConfig = load_agent_config(env_file)?;
    let identity = resolve_identity(&agent_config);

    let client = Arc::new(HttpCoordinatorClient::new(
        &identity.coordinator_host,
        agent_config.request_timeout(),
    )?);
    let meta_store = Arc::new(load_meta_store(&agent_config).await?);
    let materializer = FileMaterializer::new(&agent_config.conf_dir, agent_config.global_conf_file.clone());

    let agent = CoordinatorAgent::init(
        client,
        meta_store,
        &materializer,
        identity,
        agent_config.advance_watermark_on_partial_failure,
    )
    .await?;

    let exit = agent
        .run(agent_config.heartbeat_interval(), shutdown_signal())
        .await;
    log::info!("Coordinator agent exited: {:?}", exit);
    Ok(exit)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C signal"),
        _ = terminate => log::info!("Received SIGTERM signal"),
    }
}
