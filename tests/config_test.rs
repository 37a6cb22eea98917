use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use edge_node_agent::agent::identity::{default_host_name, resolve_identity};
use edge_node_agent::agent::registration::validate_identity;
use edge_node_agent::common::config::{StorageType, load_agent_config_from_map};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_defaults_apply_when_unset() {
    let config = load_agent_config_from_map(vars(&[
        ("NODE_IP", "10.0.0.1"),
        ("COORDINATOR_HOST", "coord:8080"),
    ]))
    .unwrap();

    assert_eq!(config.node_port, 9081);
    assert_eq!(config.conf_dir, PathBuf::from("./etc"));
    assert_eq!(config.global_conf_file, "kuiper.yaml");
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.meta_store_type, StorageType::File);
    assert_eq!(config.meta_store_file_dir, PathBuf::from("./data/meta"));
    assert!(config.meta_store_redis_urls.is_none());
    assert!(config.advance_watermark_on_partial_failure);
    assert!(config.node_tag.is_empty());
}

#[test]
fn test_overrides_are_parsed() {
    let config = load_agent_config_from_map(vars(&[
        ("NODE_IP", "192.168.1.5"),
        ("NODE_PORT", "9100"),
        ("NODE_NAME", "edge-1"),
        ("NODE_TAG", "factory"),
        ("COORDINATOR_HOST", "coord:8080"),
        ("CONF_DIR", "/opt/kuiper/etc"),
        ("HEARTBEAT_INTERVAL_SECS", "3"),
        ("META_STORE_TYPE", "redis"),
        ("META_STORE_REDIS_URLS", "redis://a:6379,redis://b:6379"),
        ("ADVANCE_WATERMARK_ON_PARTIAL_FAILURE", "false"),
    ]))
    .unwrap();

    assert_eq!(config.node_port, 9100);
    assert_eq!(config.node_name.as_deref(), Some("edge-1"));
    assert_eq!(config.node_tag, "factory");
    assert_eq!(config.conf_dir, PathBuf::from("/opt/kuiper/etc"));
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(3));
    assert_eq!(config.meta_store_type, StorageType::Redis);
    assert_eq!(
        config.meta_store_redis_urls.as_deref(),
        Some("redis://a:6379,redis://b:6379")
    );
    assert!(!config.advance_watermark_on_partial_failure);
}

#[test]
fn test_identity_uses_configured_name() {
    let config = load_agent_config_from_map(vars(&[
        ("NODE_IP", " 10.0.0.2 "),
        ("NODE_NAME", "edge-2"),
        ("COORDINATOR_HOST", "coord:8080"),
    ]))
    .unwrap();

    let identity = resolve_identity(&config);
    assert_eq!(identity.name, "edge-2");
    assert_eq!(identity.ip, "10.0.0.2");
    assert_eq!(identity.port, 9081);
    assert_eq!(identity.coordinator_host, "coord:8080");
    assert!(validate_identity(&identity).is_ok());
}

#[test]
fn test_blank_name_falls_back_to_host_name() {
    let config = load_agent_config_from_map(vars(&[
        ("NODE_IP", "10.0.0.2"),
        ("NODE_NAME", "   "),
        ("COORDINATOR_HOST", "coord:8080"),
    ]))
    .unwrap();

    assert_eq!(resolve_identity(&config).name, default_host_name());
}

#[test]
fn test_identity_validation() {
    let config = load_agent_config_from_map(vars(&[("COORDINATOR_HOST", "coord:8080")])).unwrap();
    let mut identity = resolve_identity(&config);
    assert!(validate_identity(&identity).is_err());

    identity.ip = "not-an-ip".to_string();
    assert!(validate_identity(&identity).is_err());

    identity.ip = "10.0.0.3".to_string();
    assert!(validate_identity(&identity).is_ok());

    identity.coordinator_host.clear();
    assert!(validate_identity(&identity).is_err());
}
