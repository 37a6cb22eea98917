use crate::common::config::AgentConfig;
use crate::common::node::NodeIdentity;

/// Builds the node identity from bootstrap configuration. An unset or blank
/// node name falls back to the host name.
pub fn resolve_identity(config: &AgentConfig) -> NodeIdentity {
    let name = config
        .node_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_host_name);

    NodeIdentity {
        name,
        tag: config.node_tag.clone(),
        ip: config.node_ip.trim().to_string(),
        port: config.node_port,
        coordinator_host: config.coordinator_host.trim().to_string(),
    }
}

pub fn default_host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_default()
}
