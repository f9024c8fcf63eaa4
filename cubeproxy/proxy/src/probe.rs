use cubeproxy_config::ClusterConfig;
use cubeproxy_kube::{PodProbe, PodRef};
use tracing::debug;

use crate::{retry::RetryPolicy, transport::RpcTransport, url::ProxyTarget};

/// [`PodProbe`] that GETs `path` on the pod through the API server proxy.
///
/// Goes through [`RpcTransport::get_status`] with [`RetryPolicy::once`]: a GET, since checking
/// that a pod serves `path` must not run anything there, and a single attempt, since the next
/// pod is the retry. Any `2xx` is a pass. Failures are logged and count as "not serving".
#[derive(Clone, Debug)]
pub struct HttpProbe {
    transport: RpcTransport,
    cluster: ClusterConfig,
    path: String,
}

impl HttpProbe {
    pub fn new<P: Into<String>>(transport: RpcTransport, cluster: ClusterConfig, path: P) -> Self {
        HttpProbe {
            transport,
            cluster,
            path: path.into(),
        }
    }
}

impl PodProbe for HttpProbe {
    async fn probe(&self, namespace: &str, pod: &PodRef) -> bool {
        let url = match ProxyTarget::new(&self.cluster, pod.name(), self.path.as_str())
            .namespace(namespace)
            .url()
        {
            Ok(url) => url,
            Err(fail) => {
                debug!(pod = pod.name(), %fail, "could not build probe url");
                return false;
            }
        };

        match self.transport.get_status(&url, &RetryPolicy::once()).await {
            Ok(status) if status.is_success() => true,
            Ok(status) => {
                debug!(%url, %status, "probe rejected");
                false
            }
            Err(fail) => {
                debug!(%url, %fail, "probe failed");
                false
            }
        }
    }
}
