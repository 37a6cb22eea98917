use thiserror::Error;

/// Errors raised while talking to the coordinator or validating the node
/// identity. Storage and bootstrap glue use `anyhow` instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("register node failed: {message}")]
    Registration { code: i32, message: String },

    #[error("{endpoint} failed, response code {code} response msg: {message}")]
    Api {
        endpoint: &'static str,
        code: i32,
        message: String,
    },

    #[error("{endpoint} returned http status {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
    },

    #[error("{endpoint} response carried no data")]
    MissingData { endpoint: &'static str },

    #[error("transport error on {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid node identity: {0}")]
    InvalidIdentity(String),

    #[error("global configuration is empty")]
    EmptyGlobalConfig,
}

impl AgentError {
    /// Rewraps any coordinator failure of the register call as a
    /// `Registration` error carrying the coordinator message.
    pub fn into_registration(self) -> AgentError {
        match self {
            AgentError::Registration { .. } | AgentError::InvalidIdentity(_) => self,
            AgentError::Api { code, message, .. } => AgentError::Registration { code, message },
            other => AgentError::Registration {
                code: -1,
                message: other.to_string(),
            },
        }
    }
}
