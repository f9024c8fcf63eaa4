use cubeproxy_config::ConfigError;
use cubeproxy_kube::KubeApiError;
use thiserror::Error;

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Kube(#[from] KubeApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Request to `{url}` failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Reading the response body from `{url}` failed: {source}")]
    ResponseBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to `{url}` returned unexpected status {status}: {message}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Expected a `{expected}` in the response, got a `{found}`")]
    PayloadTypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Failed to encode RPC payload: {0}")]
    PayloadEncode(#[from] bincode::error::EncodeError),

    #[error("Failed to decode RPC payload: {0}")]
    PayloadDecode(#[from] bincode::error::DecodeError),

    #[error("Invalid proxy configuration: {0}")]
    Configuration(String),

    #[error("Failed to build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error("IO failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub(crate) fn configuration<M: Into<String>>(message: M) -> Self {
        ProxyError::Configuration(message.into())
    }
}
