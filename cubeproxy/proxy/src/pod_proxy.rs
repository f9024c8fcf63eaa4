use bytes::Bytes;
use cubeproxy_config::{ClusterConfig, ProxyConfig, ReadinessConfig};
use cubeproxy_kube::{
    KubePodDirectory, LabelSelector, PodDirectory, PodRef, PodResolver, RestPodDirectory,
};
use tracing::debug;

use crate::{
    client::build_client,
    envelope::RpcMessage,
    error::Result,
    probe::HttpProbe,
    retry::RetryPolicy,
    route::RouteNameContext,
    transport::RpcTransport,
    url::ProxyTarget,
};

/// Talks to the pods of one namespace: picks a pod by labels, then calls into it through the
/// API server proxy.
///
/// Every call lists the pods again, nothing about them is kept between calls.
#[derive(Debug)]
pub struct PodProxy<D> {
    resolver: PodResolver<D>,
    transport: RpcTransport,
    cluster: ClusterConfig,
    readiness: ReadinessConfig,
    retry: RetryPolicy,
}

impl PodProxy<RestPodDirectory> {
    /// Lists pods over the same client used for the proxy calls.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`PodProxy::from_config`], resolving host names through `routes` first.
    pub fn from_config_with_routes(config: &ProxyConfig, routes: &RouteNameContext) -> Result<Self> {
        Self::build(config, Some(routes))
    }

    fn build(config: &ProxyConfig, routes: Option<&RouteNameContext>) -> Result<Self> {
        let client = build_client(config, routes)?;
        let directory = RestPodDirectory::new(
            client.clone(),
            config.cluster.master_url.clone(),
            config.cluster.api_version.clone(),
        );

        Self::new(directory, client, config)
    }
}

impl PodProxy<KubePodDirectory> {
    /// Lists pods through a kube client built from the kube config (or the in-cluster
    /// environment).
    pub async fn connect(config: &ProxyConfig) -> Result<Self> {
        Self::connect_inner(config, None).await
    }

    /// Like [`PodProxy::connect`], with `routes` resolving host names for the proxy calls.
    pub async fn connect_with_routes(
        config: &ProxyConfig,
        routes: &RouteNameContext,
    ) -> Result<Self> {
        Self::connect_inner(config, Some(routes)).await
    }

    async fn connect_inner(
        config: &ProxyConfig,
        routes: Option<&RouteNameContext>,
    ) -> Result<Self> {
        let directory = KubePodDirectory::create(&config.cluster).await?;
        let client = build_client(config, routes)?;

        Self::new(directory, client, config)
    }
}

impl<D> PodProxy<D>
where
    D: PodDirectory,
{
    pub fn new(directory: D, client: reqwest::Client, config: &ProxyConfig) -> Result<Self> {
        Ok(PodProxy {
            resolver: PodResolver::new(directory),
            transport: RpcTransport::new(client),
            cluster: config.cluster.clone(),
            readiness: config.readiness.clone(),
            retry: RetryPolicy::try_from(&config.retry)?,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn resolver(&self) -> &PodResolver<D> {
        &self.resolver
    }

    pub fn transport(&self) -> &RpcTransport {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn namespace(&self) -> &str {
        &self.cluster.namespace
    }

    pub fn target<P, Q>(&self, pod_name: P, path: Q) -> ProxyTarget
    where
        P: Into<String>,
        Q: Into<String>,
    {
        ProxyTarget::new(&self.cluster, pod_name, path)
    }

    pub async fn resolve(&self, selector: &LabelSelector, index: usize) -> Result<PodRef> {
        Ok(self
            .resolver
            .resolve_by_index(self.namespace(), selector, index)
            .await?)
    }

    /// Proxy URL of `path` on the `index`th pod matching `selector`.
    pub async fn url_for(
        &self,
        selector: &LabelSelector,
        index: usize,
        path: &str,
        query: Option<&str>,
    ) -> Result<String> {
        let pod = self.resolve(selector, index).await?;

        let mut target = self.target(pod.name, path);
        if let Some(query) = query {
            target = target.query(query);
        }

        let url = target.url()?;
        debug!(%url, "resolved proxy url");
        Ok(url)
    }

    /// Resolves the pod, then does an [`RpcTransport::call`] on it.
    #[tracing::instrument(level = "debug", skip(self, request), err)]
    pub async fn call<Req, Resp>(
        &self,
        selector: &LabelSelector,
        index: usize,
        path: &str,
        query: Option<&str>,
        request: Option<&Req>,
    ) -> Result<Option<Resp>>
    where
        Req: RpcMessage,
        Resp: RpcMessage,
    {
        let url = self.url_for(selector, index, path, query).await?;
        self.transport.call(&url, request, &self.retry).await
    }

    /// Resolves the pod, then does an [`RpcTransport::post_raw`] on it.
    #[tracing::instrument(level = "debug", skip(self, body), err)]
    pub async fn post_with_labels(
        &self,
        selector: &LabelSelector,
        index: usize,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Option<Bytes>> {
        let url = self.url_for(selector, index, path, None).await?;
        self.transport.post_raw(&url, body, &self.retry).await
    }

    /// First pod (and its index) matching `selector` that answers a GET on `path`.
    pub async fn find_pod_serving(
        &self,
        selector: &LabelSelector,
        path: &str,
    ) -> Result<(usize, PodRef)> {
        let probe = HttpProbe::new(self.transport.clone(), self.cluster.clone(), path);

        Ok(self
            .resolver
            .find_first_ready_by_probe(self.namespace(), selector, &probe)
            .await?)
    }

    /// Waits for a ready pod matching `selector`, as configured in the readiness section.
    pub async fn await_ready(&self, selector: &LabelSelector) -> Result<PodRef> {
        Ok(self
            .resolver
            .await_ready(
                self.namespace(),
                selector,
                self.readiness.attempts,
                self.readiness.interval,
            )
            .await?)
    }

    pub async fn pod_names(&self, selector: &LabelSelector) -> Result<Vec<String>> {
        Ok(self.resolver.pod_names(self.namespace(), selector).await?)
    }
}
