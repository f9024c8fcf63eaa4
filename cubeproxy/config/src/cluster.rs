use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::{
    from_env::FromEnv, source::ConfigSource, ConfigContext, ConfigError, GenerateConfig, Result,
};

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_CONTAINER_PORT: u16 = 8080;

/// How the container port is encoded in a pod proxy URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyAddressing {
    /// `.../pods/{pod}:{port}/proxy{path}`
    #[default]
    PortInPath,

    /// `.../pods/{pod}/proxy{path}?port=8080`
    PortQuery,
}

impl FromStr for ProxyAddressing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "port-in-path" => Ok(Self::PortInPath),
            "port-query" => Ok(Self::PortQuery),
            other => Err(ConfigError::InvalidValue(other.to_owned(), "addressing")),
        }
    }
}

impl fmt::Display for ProxyAddressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortInPath => f.write_str("port-in-path"),
            Self::PortQuery => f.write_str("port-query"),
        }
    }
}

/// # `cluster`
///
/// Where the cluster API lives and how pods are addressed through it.
///
/// ```json
/// {
///   "cluster": {
///     "master_url": "https://master:8443",
///     "api_version": "v1",
///     "namespace": "myns",
///     "container_port": 8080,
///     "addressing": "port-in-path",
///     "kubeconfig": "~/.kube/config",
///     "kube_context": null,
///     "accept_invalid_certificates": false
///   }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterFileConfig {
    pub master_url: Option<String>,
    pub api_version: Option<String>,
    pub namespace: Option<String>,
    pub container_port: Option<u16>,
    pub addressing: Option<ProxyAddressing>,
    pub kubeconfig: Option<String>,
    pub kube_context: Option<String>,
    pub accept_invalid_certificates: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Base URL of the cluster API server, e.g. `https://master:8443`.
    ///
    /// Used verbatim as the prefix of every proxy URL.
    pub master_url: String,

    pub api_version: String,

    pub namespace: String,

    /// Container port targeted by [`ProxyAddressing::PortInPath`] URLs.
    pub container_port: u16,

    pub addressing: ProxyAddressing,

    /// Path to a kubeconfig file. Supports `~` and env var expansion.
    pub kubeconfig: Option<String>,

    pub kube_context: Option<String>,

    pub accept_invalid_certificates: bool,
}

impl GenerateConfig for ClusterFileConfig {
    type Generated = ClusterConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        let master_url = FromEnv::<String>::new("CUBEPROXY_MASTER_URL")
            .or(self.master_url)
            .source_value(context)
            .transpose()?
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::ValueNotProvided(
                "cluster",
                "master_url",
                Some("CUBEPROXY_MASTER_URL"),
            ))?;

        if master_url.ends_with('/') {
            context.add_warning(format!(
                "`cluster.master_url` ends with `/` ({master_url}), proxy URLs will contain `//`"
            ));
        }

        let api_version = FromEnv::new("CUBEPROXY_API_VERSION")
            .or(self.api_version)
            .source_value(context)
            .transpose()?
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned());

        let namespace = FromEnv::new("CUBEPROXY_NAMESPACE")
            .or(self.namespace)
            .source_value(context)
            .transpose()?
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());

        let container_port = FromEnv::new("CUBEPROXY_CONTAINER_PORT")
            .or(self.container_port)
            .source_value(context)
            .transpose()?
            .unwrap_or(DEFAULT_CONTAINER_PORT);

        let addressing = FromEnv::new("CUBEPROXY_PROXY_ADDRESSING")
            .or(self.addressing)
            .source_value(context)
            .transpose()?
            .unwrap_or_default();

        let kubeconfig = FromEnv::new("CUBEPROXY_KUBECONFIG")
            .or(self.kubeconfig)
            .source_value(context)
            .transpose()?;

        let kube_context = FromEnv::new("CUBEPROXY_KUBE_CONTEXT")
            .or(self.kube_context)
            .source_value(context)
            .transpose()?;

        let accept_invalid_certificates = FromEnv::new("CUBEPROXY_ACCEPT_INVALID_CERTIFICATES")
            .or(self.accept_invalid_certificates)
            .source_value(context)
            .transpose()?
            .unwrap_or(false);

        Ok(ClusterConfig {
            master_url,
            api_version,
            namespace,
            container_port,
            addressing,
            kubeconfig,
            kube_context,
            accept_invalid_certificates,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn context() -> ConfigContext {
        ConfigContext::default().strict_env(true)
    }

    #[test]
    fn defaults() {
        let config = ClusterFileConfig {
            master_url: Some("https://master:8443".into()),
            ..Default::default()
        }
        .generate_config(&mut context())
        .unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.namespace, "default");
        assert_eq!(config.container_port, 8080);
        assert_eq!(config.addressing, ProxyAddressing::PortInPath);
        assert!(!config.accept_invalid_certificates);
    }

    #[test]
    fn master_url_is_required() {
        let error = ClusterFileConfig::default()
            .generate_config(&mut context())
            .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::ValueNotProvided("cluster", "master_url", _)
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut context = context()
            .override_env("CUBEPROXY_NAMESPACE", "from-env")
            .override_env("CUBEPROXY_CONTAINER_PORT", "9990")
            .override_env("CUBEPROXY_PROXY_ADDRESSING", "port-query");

        let config = ClusterFileConfig {
            master_url: Some("https://master:8443".into()),
            namespace: Some("from-file".into()),
            container_port: Some(8081),
            ..Default::default()
        }
        .generate_config(&mut context)
        .unwrap();

        assert_eq!(config.namespace, "from-env");
        assert_eq!(config.container_port, 9990);
        assert_eq!(config.addressing, ProxyAddressing::PortQuery);
    }

    #[test]
    fn trailing_slash_warns() {
        let mut context = context();
        ClusterFileConfig {
            master_url: Some("https://master:8443/".into()),
            ..Default::default()
        }
        .generate_config(&mut context)
        .unwrap();

        assert!(context.has_warnings());
    }

    #[rstest]
    #[case("port-in-path", ProxyAddressing::PortInPath)]
    #[case("port-query", ProxyAddressing::PortQuery)]
    fn addressing_parses(#[case] raw: &str, #[case] expected: ProxyAddressing) {
        assert_eq!(raw.parse::<ProxyAddressing>().unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }
}
