use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{from_env::FromEnv, source::ConfigSource, ConfigContext, GenerateConfig, Result};

/// # `http`
///
/// Settings of the HTTP client shared by every proxy call.
///
/// ```json
/// {
///   "http": {
///     "connect_timeout_secs": 10,
///     "request_timeout_secs": 30,
///     "cookie_store": false
///   }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFileConfig {
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub cookie_store: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpConfig {
    pub connect_timeout: Duration,

    /// Bounds a whole request, from connecting until the response body is read.
    pub request_timeout: Duration,

    /// Keeps cookies set by the pods between calls.
    pub cookie_store: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            cookie_store: false,
        }
    }
}

impl GenerateConfig for HttpFileConfig {
    type Generated = HttpConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        let defaults = HttpConfig::default();

        let connect_timeout = FromEnv::new("CUBEPROXY_CONNECT_TIMEOUT_SECS")
            .or(self.connect_timeout_secs)
            .source_value(context)
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout);

        let request_timeout = FromEnv::new("CUBEPROXY_REQUEST_TIMEOUT_SECS")
            .or(self.request_timeout_secs)
            .source_value(context)
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let cookie_store = FromEnv::new("CUBEPROXY_COOKIE_STORE")
            .or(self.cookie_store)
            .source_value(context)
            .transpose()?
            .unwrap_or(defaults.cookie_store);

        Ok(HttpConfig {
            connect_timeout,
            request_timeout,
            cookie_store,
        })
    }
}
