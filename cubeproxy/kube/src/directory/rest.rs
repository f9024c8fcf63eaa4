use k8s_openapi::{api::core::v1::Pod, List};
use tracing::{debug, trace};

use super::PodDirectory;
use crate::{
    error::{KubeApiError, Result},
    pod::PodRef,
    selector::LabelSelector,
};

/// [`PodDirectory`] talking plain REST to the cluster API with a [`reqwest::Client`].
///
/// Meant to share the client (and so the auth headers, TLS setup and cookies) used for the proxy
/// calls, for clusters reachable only through credentials the kube config does not know about.
#[derive(Clone, Debug)]
pub struct RestPodDirectory {
    client: reqwest::Client,
    master_url: String,
    api_version: String,
}

impl RestPodDirectory {
    pub fn new<M, V>(client: reqwest::Client, master_url: M, api_version: V) -> Self
    where
        M: Into<String>,
        V: Into<String>,
    {
        RestPodDirectory {
            client,
            master_url: master_url.into(),
            api_version: api_version.into(),
        }
    }

    fn pods_url(&self, namespace: &str) -> String {
        format!(
            "{}/api/{}/namespaces/{namespace}/pods",
            self.master_url, self.api_version
        )
    }
}

impl PodDirectory for RestPodDirectory {
    #[tracing::instrument(level = "trace", skip(self), err)]
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodRef>> {
        let url = self.pods_url(namespace);
        let label_selector = selector.to_string();

        let mut continue_token: Option<String> = None;
        let mut pods = Vec::new();

        loop {
            let mut request = self.client.get(&url);
            if !selector.is_empty() {
                request = request.query(&[("labelSelector", label_selector.as_str())]);
            }
            if let Some(token) = continue_token.as_deref() {
                request = request.query(&[("continue", token)]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_else(|fail| {
                    debug!(%url, %fail, "failed to read the error body");
                    String::new()
                });

                return Err(KubeApiError::ListFailed {
                    url,
                    status: status.as_u16(),
                    message,
                });
            }

            let list: List<Pod> = response.json().await?;
            for pod in &list.items {
                let pod = PodRef::try_from(pod)?;
                if selector.matches(&pod.labels) {
                    pods.push(pod);
                }
            }

            continue_token = list.metadata.continue_.filter(|token| !token.is_empty());
            if continue_token.is_none() {
                break;
            }
        }

        trace!(count = pods.len(), "listed pods");
        Ok(pods)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::crypto::install_crypto_provider;

    fn client() -> reqwest::Client {
        install_crypto_provider();
        reqwest::Client::new()
    }

    #[tokio::test]
    async fn lists_pods_over_rest() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/myns/pods"))
            .and(query_param("labelSelector", "app=web,tier=front"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "metadata": {},
                "items": [
                    {
                        "metadata": {
                            "name": "web-1",
                            "labels": { "app": "web", "tier": "front" }
                        },
                        "status": { "phase": "Pending" }
                    },
                    {
                        "metadata": {
                            "name": "web-0",
                            "labels": { "app": "web", "tier": "front" }
                        },
                        "status": {
                            "phase": "Running",
                            "conditions": [{ "type": "Ready", "status": "True" }]
                        }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let directory = RestPodDirectory::new(client(), server.uri(), "v1");
        let pods = directory
            .list_pods(
                "myns",
                &LabelSelector::new().with("tier", "front").with("app", "web"),
            )
            .await
            .unwrap();

        let names: Vec<_> = pods.iter().map(PodRef::name).collect();
        assert_eq!(names, ["web-1", "web-0"]);
        assert!(!pods[0].is_ready());
        assert!(pods[1].is_ready());
    }

    #[tokio::test]
    async fn uses_the_given_client_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/myns/pods"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "metadata": {},
                "items": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        install_crypto_provider();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_static("Bearer abc"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap();

        let pods = RestPodDirectory::new(client, server.uri(), "v1")
            .list_pods("myns", &LabelSelector::new())
            .await
            .unwrap();

        assert!(pods.is_empty());
    }

    #[tokio::test]
    async fn forbidden_is_reported_with_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/myns/pods"))
            .respond_with(ResponseTemplate::new(403).set_body_string("pods is forbidden"))
            .mount(&server)
            .await;

        let error = RestPodDirectory::new(client(), server.uri(), "v1")
            .list_pods("myns", &LabelSelector::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            KubeApiError::ListFailed { status: 403, ref message, .. } if message == "pods is forbidden"
        ));
    }
}
