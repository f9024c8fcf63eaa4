use std::ops::Deref;

use cubeproxy_config::ClusterConfig;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::ListParams,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use tracing::trace;

use super::PodDirectory;
use crate::{
    crypto::install_crypto_provider,
    error::{KubeApiError, Result},
    pod::PodRef,
    selector::LabelSelector,
};

/// Page size used when listing pods.
const LIST_LIMIT: u32 = 500;

/// [`PodDirectory`] backed by a [`kube::Client`].
#[derive(Clone)]
pub struct KubePodDirectory {
    client: Client,
}

impl KubePodDirectory {
    pub fn new(client: Client) -> Self {
        KubePodDirectory { client }
    }

    pub async fn create(config: &ClusterConfig) -> Result<Self> {
        let client = create_kube_api(
            config.accept_invalid_certificates,
            config.kubeconfig.as_deref(),
            config.kube_context.clone(),
        )
        .await?;

        Ok(KubePodDirectory::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl PodDirectory for KubePodDirectory {
    #[tracing::instrument(level = "trace", skip(self), err)]
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodRef>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let mut params = ListParams {
            label_selector: (!selector.is_empty()).then(|| selector.to_string()),
            limit: Some(LIST_LIMIT),
            ..Default::default()
        };

        let mut pods = Vec::new();
        loop {
            let response = api.list(&params).await?;

            for pod in &response.items {
                let pod = PodRef::try_from(pod)?;
                if selector.matches(&pod.labels) {
                    pods.push(pod);
                }
            }

            match response.metadata.continue_.filter(|token| !token.is_empty()) {
                Some(next) => {
                    params = params.continue_token(&next);
                }
                None => break,
            }
        }

        trace!(count = pods.len(), "listed pods");
        Ok(pods)
    }
}

/// Builds a [`Client`] from `kubeconfig` (or the default kubeconfig, or the in-cluster
/// environment), optionally switching to `kube_context`.
pub async fn create_kube_api(
    accept_invalid_certificates: bool,
    kubeconfig: Option<&str>,
    kube_context: Option<String>,
) -> Result<Client> {
    install_crypto_provider();

    let kube_config_opts = KubeConfigOptions {
        context: kube_context,
        ..Default::default()
    };

    let mut config = if let Some(kubeconfig) = kubeconfig {
        let kubeconfig = shellexpand::full(kubeconfig)
            .map_err(|e| KubeApiError::ConfigPathExpansionError(e.to_string()))?;
        let parsed_kube_config = Kubeconfig::read_from(kubeconfig.deref())?;
        Config::from_custom_kubeconfig(parsed_kube_config, &kube_config_opts).await?
    } else if kube_config_opts.context.is_some() {
        // A context only exists in a kubeconfig.
        Config::from_kubeconfig(&kube_config_opts).await?
    } else {
        // Local kubeconfig first, then the in-cluster service account.
        Config::infer().await?
    };
    config.accept_invalid_certs = accept_invalid_certificates;
    Client::try_from(config).map_err(KubeApiError::from)
}
