use std::net::IpAddr;

use crate::common::error::AgentError;
use crate::common::node::{NodeIdentity, RegisteredNode};
use crate::common::response::{RegisterRequest, UnregisterRequest};
use crate::traits::coordinator_client::CoordinatorClient;

pub fn validate_identity(identity: &NodeIdentity) -> Result<(), AgentError> {
    if identity.ip.is_empty() {
        return Err(AgentError::InvalidIdentity("node ip is empty".to_string()));
    }
    if identity.ip.parse::<IpAddr>().is_err() {
        return Err(AgentError::InvalidIdentity(format!(
            "node ip {} is not a valid address",
            identity.ip
        )));
    }
    if identity.port == 0 {
        return Err(AgentError::InvalidIdentity("node port must be positive".to_string()));
    }
    if identity.coordinator_host.is_empty() {
        return Err(AgentError::InvalidIdentity("coordinator host is empty".to_string()));
    }
    Ok(())
}

/// Exchanges the identity for a worker id. Any failure here is fatal to
/// startup.
pub async fn register<C>(client: &C, identity: NodeIdentity) -> Result<RegisteredNode, AgentError>
where
    C: CoordinatorClient,
{
    validate_identity(&identity)?;
    log::info!("Start to register node {}", identity.name);
    let request = RegisterRequest {
        name: identity.name.clone(),
        ip: identity.ip.clone(),
        tag: identity.tag.clone(),
        port: identity.port,
    };
    let response = client
        .register(&request)
        .await
        .map_err(AgentError::into_registration)?;
    log::info!("Node {} registered with worker id {}", identity.name, response.worker_id);
    Ok(RegisteredNode::new(identity, response.worker_id))
}

/// Best-effort deregistration; the coordinator reaps stale nodes anyway.
pub async fn unregister<C>(client: &C, node: &RegisteredNode)
where
    C: CoordinatorClient,
{
    let request = UnregisterRequest {
        worker_id: node.worker_id,
    };
    match client.unregister(&request).await {
        Ok(()) => log::info!("Worker {} unregistered", node.worker_id),
        Err(e) => log::warn!("Failed to unregister worker {}: {}", node.worker_id, e),
    }
}
