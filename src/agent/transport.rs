use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::common::error::AgentError;
use crate::common::response::{
    ApiResponse, ConfigurationRequest, ConfigurationResponse, HEARTBEAT_PATH, HeartbeatRequest,
    HeartbeatStatus, LOAD_CONFIGURATION_PATH, REGISTER_PATH, RegisterRequest, RegisterResponse,
    UNREGISTER_PATH, UnregisterRequest,
};
use crate::common::snapshot::ConfigurationSnapshot;
use crate::traits::coordinator_client::CoordinatorClient;

/// JSON-over-HTTP client for the coordinator API. Every call is a POST whose
/// response body is an `ApiResponse` envelope.
#[derive(Clone)]
pub struct HttpCoordinatorClient {
    base: String,
    client: Client,
}

impl HttpCoordinatorClient {
    /// `coordinator_host` is `host:port`, optionally with a scheme.
    pub fn new(coordinator_host: &str, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| AgentError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            base: base_url(coordinator_host),
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn post<Req>(&self, endpoint: &'static str, body: &Req) -> Result<ApiResponse, AgentError>
    where
        Req: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base, endpoint);
        log::debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| AgentError::Transport { endpoint, source })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| AgentError::Transport { endpoint, source })?;
        match serde_json::from_slice::<ApiResponse>(&bytes) {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                log::debug!("{} returned an undecodable body: {}", endpoint, e);
                if status.is_success() {
                    Err(AgentError::Api {
                        endpoint,
                        code: -1,
                        message: format!("invalid response body: {}", e),
                    })
                } else {
                    Err(AgentError::Status {
                        endpoint,
                        status: status.as_u16(),
                    })
                }
            }
        }
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl CoordinatorClient for HttpCoordinatorClient {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AgentError> {
        self.post(REGISTER_PATH, request)
            .await?
            .into_data::<RegisterResponse>(REGISTER_PATH)
    }

    async fn unregister(&self, request: &UnregisterRequest) -> Result<(), AgentError> {
        self.post(UNREGISTER_PATH, request)
            .await?
            .into_unit(UNREGISTER_PATH)
    }

    async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatStatus, AgentError> {
        self.post(HEARTBEAT_PATH, request)
            .await?
            .into_data::<HeartbeatStatus>(HEARTBEAT_PATH)
    }

    async fn load_configuration(&self, request: &ConfigurationRequest) -> Result<ConfigurationSnapshot, AgentError> {
        let resp = self
            .post(LOAD_CONFIGURATION_PATH, request)
            .await?
            .into_data::<ConfigurationResponse>(LOAD_CONFIGURATION_PATH)?;
        Ok(resp.into())
    }
}
