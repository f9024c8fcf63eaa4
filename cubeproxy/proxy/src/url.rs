use cubeproxy_config::{ClusterConfig, ProxyAddressing};

use crate::error::{ProxyError, Result};

/// Port targeted by [`ProxyAddressing::PortQuery`] URLs.
pub const QUERY_ADDRESSING_PORT: u16 = 8080;

/// Builds the URL of `path` on `pod_name`, tunnelled through the API server's pod proxy
/// subresource:
///
/// `{host}/api/{api_version}/namespaces/{namespace}/pods/{pod_name}:{port}/proxy{path}[?{query}]`
///
/// `host` and `path` are used as given, so `path` should start with `/`.
pub fn build_url(
    host: &str,
    api_version: &str,
    namespace: &str,
    pod_name: &str,
    container_port: u16,
    path: &str,
    query: Option<&str>,
) -> Result<String> {
    check_target(pod_name, path)?;

    let mut url = format!(
        "{host}/api/{api_version}/namespaces/{namespace}/pods/{pod_name}:{container_port}/proxy{path}"
    );
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    Ok(url)
}

/// Same as [`build_url`], but the port goes in the query string and is always
/// [`QUERY_ADDRESSING_PORT`]:
///
/// `{host}/api/{api_version}/namespaces/{namespace}/pods/{pod_name}/proxy{path}?port=8080[&{query}]`
pub fn build_port_query_url(
    host: &str,
    api_version: &str,
    namespace: &str,
    pod_name: &str,
    path: &str,
    query: Option<&str>,
) -> Result<String> {
    check_target(pod_name, path)?;

    let mut url = format!(
        "{host}/api/{api_version}/namespaces/{namespace}/pods/{pod_name}/proxy{path}?port={QUERY_ADDRESSING_PORT}"
    );
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.push('&');
        url.push_str(query);
    }

    Ok(url)
}

fn check_target(pod_name: &str, path: &str) -> Result<()> {
    if pod_name.is_empty() {
        return Err(ProxyError::configuration("pod name is empty"));
    }

    if path.is_empty() {
        return Err(ProxyError::configuration(format!(
            "path for pod `{pod_name}` is empty"
        )));
    }

    Ok(())
}

/// Everything that makes up a single pod proxy URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyTarget {
    pub host: String,
    pub api_version: String,
    pub namespace: String,
    pub pod_name: String,
    pub container_port: u16,
    pub path: String,
    pub query: Option<String>,
    pub addressing: ProxyAddressing,
}

impl ProxyTarget {
    /// Target on the cluster described by `cluster`, with its namespace, port and addressing.
    pub fn new<P, Q>(cluster: &ClusterConfig, pod_name: P, path: Q) -> Self
    where
        P: Into<String>,
        Q: Into<String>,
    {
        ProxyTarget {
            host: cluster.master_url.clone(),
            api_version: cluster.api_version.clone(),
            namespace: cluster.namespace.clone(),
            pod_name: pod_name.into(),
            container_port: cluster.container_port,
            path: path.into(),
            query: None,
            addressing: cluster.addressing,
        }
    }

    pub fn namespace<N: Into<String>>(mut self, namespace: N) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn query<Q: Into<String>>(mut self, query: Q) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn url(&self) -> Result<String> {
        match self.addressing {
            ProxyAddressing::PortInPath => build_url(
                &self.host,
                &self.api_version,
                &self.namespace,
                &self.pod_name,
                self.container_port,
                &self.path,
                self.query.as_deref(),
            ),
            ProxyAddressing::PortQuery => build_port_query_url(
                &self.host,
                &self.api_version,
                &self.namespace,
                &self.pod_name,
                &self.path,
                self.query.as_deref(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn port_in_path() {
        let url = build_url(
            "https://master:8443",
            "v1",
            "myns",
            "web-7f8d-abcde",
            8080,
            "/health",
            Some("x=1"),
        )
        .unwrap();

        assert_eq!(
            url,
            "https://master:8443/api/v1/namespaces/myns/pods/web-7f8d-abcde:8080/proxy/health?x=1"
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn no_query(#[case] query: Option<&str>) {
        let url = build_url("https://master:8443", "v1", "myns", "web", 9990, "/", query).unwrap();

        assert_eq!(
            url,
            "https://master:8443/api/v1/namespaces/myns/pods/web:9990/proxy/"
        );
    }

    #[rstest]
    #[case(None, "https://master:8443/api/v1/namespaces/myns/pods/web/proxy/ArquillianServletRunner?port=8080")]
    #[case(Some("outputMode=serializedObject"), "https://master:8443/api/v1/namespaces/myns/pods/web/proxy/ArquillianServletRunner?port=8080&outputMode=serializedObject")]
    fn port_query(#[case] query: Option<&str>, #[case] expected: &str) {
        let url = build_port_query_url(
            "https://master:8443",
            "v1",
            "myns",
            "web",
            "/ArquillianServletRunner",
            query,
        )
        .unwrap();

        assert_eq!(url, expected);
    }

    #[rstest]
    #[case("", "/health")]
    #[case("web", "")]
    fn rejects_empty_pod_or_path(#[case] pod_name: &str, #[case] path: &str) {
        let error = build_url("https://master:8443", "v1", "myns", pod_name, 8080, path, None)
            .unwrap_err();

        assert!(matches!(error, ProxyError::Configuration(_)));
    }

    #[test]
    fn target_follows_cluster_addressing() {
        let mut cluster = ClusterConfig {
            master_url: "https://master:8443".into(),
            api_version: "v1".into(),
            namespace: "myns".into(),
            container_port: 8080,
            addressing: ProxyAddressing::PortInPath,
            kubeconfig: None,
            kube_context: None,
            accept_invalid_certificates: false,
        };

        let target = ProxyTarget::new(&cluster, "web-0", "/health").query("x=1");
        assert_eq!(
            target.url().unwrap(),
            "https://master:8443/api/v1/namespaces/myns/pods/web-0:8080/proxy/health?x=1"
        );

        cluster.addressing = ProxyAddressing::PortQuery;
        let target = ProxyTarget::new(&cluster, "web-0", "/health").namespace("other");
        assert_eq!(
            target.url().unwrap(),
            "https://master:8443/api/v1/namespaces/other/pods/web-0/proxy/health?port=8080"
        );
    }
}
