use crate::common::error::AgentError;
use crate::common::response::{
    ConfigurationRequest, HeartbeatRequest, HeartbeatStatus, RegisterRequest, RegisterResponse,
    UnregisterRequest,
};
use crate::common::snapshot::ConfigurationSnapshot;

/// One typed call per coordinator endpoint.
#[trait_variant::make(CoordinatorClient: Send)]
pub trait UnsendCoordinatorClient {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AgentError>;
    async fn unregister(&self, request: &UnregisterRequest) -> Result<(), AgentError>;
    async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatStatus, AgentError>;
    async fn load_configuration(&self, request: &ConfigurationRequest) -> Result<ConfigurationSnapshot, AgentError>;
}
