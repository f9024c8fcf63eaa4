#![warn(clippy::indexing_slicing)]
//! Configuration of the pod proxy: where the cluster is, how to authenticate, how to retry.
//!
//! A [`ProxyFileConfig`] is read from a JSON or YAML file (or built in code), then resolved into
//! a [`ProxyConfig`] with [`GenerateConfig::generate_config`]. Every value can be overridden
//! with a `CUBEPROXY_*` environment variable, which always wins over the file.

pub mod auth;
pub mod cluster;
pub mod config;
pub mod http;
pub mod readiness;
pub mod retry;

use std::{ffi::OsStr, path::Path};

pub use auth::{AuthConfig, AuthFileConfig};
pub use cluster::{ClusterConfig, ClusterFileConfig, ProxyAddressing};
pub use config::{ConfigContext, ConfigError, GenerateConfig, Result};
pub use http::{HttpConfig, HttpFileConfig};
pub use readiness::{ReadinessConfig, ReadinessFileConfig};
pub use retry::{RetryConfig, RetryFileConfig};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at the configuration file.
pub const CUBEPROXY_CONFIG_FILE_ENV: &str = "CUBEPROXY_CONFIG_FILE";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyFileConfig {
    pub cluster: Option<ClusterFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub http: Option<HttpFileConfig>,
    pub retry: Option<RetryFileConfig>,
    pub readiness: Option<ReadinessFileConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    pub cluster: ClusterConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub readiness: ReadinessConfig,
}

impl ProxyFileConfig {
    /// Reads the file, picking the format from its extension (no extension is JSON).
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(OsStr::to_str) {
            Some("json") | None => Ok(serde_json::from_str::<Self>(&contents)?),
            Some("yaml" | "yml") => Ok(serde_yaml::from_str::<Self>(&contents)?),
            ext => Err(ConfigError::UnsupportedFormat(ext.map(String::from))),
        }
    }

    /// Reads the file named by [`CUBEPROXY_CONFIG_FILE_ENV`], or starts from an empty config
    /// (everything from env and defaults) if it is not set.
    pub fn from_env(context: &ConfigContext) -> Result<Self> {
        match context.get_env(CUBEPROXY_CONFIG_FILE_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => Ok(Self::default()),
        }
    }
}

impl GenerateConfig for ProxyFileConfig {
    type Generated = ProxyConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        Ok(ProxyConfig {
            cluster: self.cluster.generate_config(context)?,
            auth: self.auth.generate_config(context)?,
            http: self.http.generate_config(context)?,
            retry: self.retry.generate_config(context)?,
            readiness: self.readiness.generate_config(context)?,
        })
    }
}

impl ProxyConfig {
    /// Shorthand for [`ProxyConfig::from_context`] on the process environment.
    ///
    /// Warnings are only logged.
    pub fn from_env() -> Result<Self> {
        let (config, _) = Self::from_context(ConfigContext::default())?;
        Ok(config)
    }

    /// [`ProxyFileConfig::from_env`] followed by generation, returning the warnings raised on
    /// the way.
    pub fn from_context(mut context: ConfigContext) -> Result<(Self, Vec<String>)> {
        let config = ProxyFileConfig::from_env(&context)?.generate_config(&mut context)?;
        Ok((config, context.into_warnings()))
    }
}
