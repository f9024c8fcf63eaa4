use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use cubeproxy_config::{AuthConfig, ProxyConfig};
use cubeproxy_kube::crypto::install_crypto_provider;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::{
    error::{ProxyError, Result},
    route::RouteNameContext,
};

/// Builds the [`reqwest::Client`] shared by every call to the cluster.
///
/// Credentials are set here once, as default headers or as the TLS identity, so requests never
/// deal with them. Pass `routes` to resolve route host names through a [`RouteNameContext`].
#[tracing::instrument(level = "debug", skip_all, err)]
pub fn build_client(
    config: &ProxyConfig,
    routes: Option<&RouteNameContext>,
) -> Result<reqwest::Client> {
    install_crypto_provider();

    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(config.cluster.accept_invalid_certificates)
        .connect_timeout(config.http.connect_timeout)
        .timeout(config.http.request_timeout)
        .cookie_store(config.http.cookie_store);

    match &config.auth {
        AuthConfig::None => {}
        AuthConfig::Bearer { token } => {
            builder = builder.default_headers(authorization(&format!("Bearer {token}"))?);
        }
        AuthConfig::Basic { username, password } => {
            let credentials = STANDARD.encode(format!("{username}:{password}"));
            builder = builder.default_headers(authorization(&format!("Basic {credentials}"))?);
        }
        AuthConfig::ClientCertificate { identity_pem } => {
            let pem = std::fs::read(identity_pem)?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(ProxyError::ClientBuild)?;
            builder = builder.identity(identity);
        }
    }

    if let Some(routes) = routes {
        builder = builder.dns_resolver(Arc::new(routes.clone()));
    }

    debug!(
        master_url = %config.cluster.master_url,
        accept_invalid_certificates = config.cluster.accept_invalid_certificates,
        "building http client"
    );

    builder.build().map_err(ProxyError::ClientBuild)
}

fn authorization(value: &str) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(value)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cubeproxy_config::{
        ClusterConfig, HttpConfig, ProxyAddressing, ReadinessConfig, RetryConfig,
    };
    use rstest::rstest;
    use wiremock::{
        matchers::{header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn config(master_url: String, auth: AuthConfig) -> ProxyConfig {
        ProxyConfig {
            cluster: ClusterConfig {
                master_url,
                api_version: "v1".into(),
                namespace: "myns".into(),
                container_port: 8080,
                addressing: ProxyAddressing::PortInPath,
                kubeconfig: None,
                kube_context: None,
                accept_invalid_certificates: false,
            },
            auth,
            http: HttpConfig {
                connect_timeout: Duration::from_secs(10),
                request_timeout: Duration::from_secs(30),
                cookie_store: true,
            },
            retry: RetryConfig {
                max_attempts: 1,
                delay: Duration::ZERO,
                desired_status_code: None,
            },
            readiness: ReadinessConfig {
                attempts: 1,
                interval: Duration::ZERO,
            },
        }
    }

    #[rstest]
    #[case::bearer(AuthConfig::Bearer { token: "s3cr3t".into() }, "Bearer s3cr3t")]
    #[case::basic(
        AuthConfig::Basic { username: "admin".into(), password: "pass".into() },
        "Basic YWRtaW46cGFzcw=="
    )]
    #[tokio::test]
    async fn credentials_become_default_headers(#[case] auth: AuthConfig, #[case] expected: &str) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/myns/pods"))
            .and(header("authorization", expected))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(&config(server.uri(), auth), None).unwrap();
        let response = client
            .get(format!("{}/api/v1/namespaces/myns/pods", server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn no_credentials_no_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = build_client(&config(server.uri(), AuthConfig::None), None).unwrap();
        let response = client.get(server.uri()).send().await.unwrap();

        assert_eq!(response.status(), 200);
    }

    #[test]
    fn header_rejects_control_characters() {
        let auth = AuthConfig::Bearer {
            token: "bad\ntoken".into(),
        };

        let error = build_client(&config("https://master:8443".into(), auth), None).unwrap_err();
        assert!(matches!(error, ProxyError::InvalidHeader(_)));
    }

    #[test]
    fn missing_identity_file_is_io() {
        let auth = AuthConfig::ClientCertificate {
            identity_pem: "/nonexistent/cubeproxy/identity.pem".into(),
        };

        let error = build_client(&config("https://master:8443".into(), auth), None).unwrap_err();
        assert!(matches!(error, ProxyError::Io(_)));
    }
}
