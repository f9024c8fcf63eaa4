use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, trace};

use crate::error::{ProxyError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Name resolution overrides for cluster routes.
///
/// Route host names usually don't resolve outside the cluster's network, so the address they
/// point at is installed here and the context is handed to the HTTP client as its resolver.
/// Names without an override go through the system resolver.
///
/// Clones share the same table. Overrides live until [`RouteNameContext::teardown`], or until
/// the [`RouteGuard`] returned by [`RouteNameContext::scoped`] is dropped.
#[derive(Clone, Debug, Default)]
pub struct RouteNameContext {
    routes: Arc<Mutex<HashMap<String, IpAddr>>>,
}

impl RouteNameContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, IpAddr>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `host` to `address` from now on, replacing any previous override.
    pub fn install<H: Into<String>>(&self, host: H, address: IpAddr) -> Result<()> {
        let host = host.into();
        if host.is_empty() {
            return Err(ProxyError::configuration("route host is empty"));
        }

        debug!(%host, %address, "installing route override");
        self.routes().insert(host, address);

        Ok(())
    }

    /// Like [`RouteNameContext::install`], removing the override when the guard is dropped.
    pub fn scoped<H: Into<String>>(&self, host: H, address: IpAddr) -> Result<RouteGuard> {
        let host = host.into();
        self.install(host.clone(), address)?;

        Ok(RouteGuard {
            context: self.clone(),
            host,
        })
    }

    pub fn remove(&self, host: &str) -> Option<IpAddr> {
        self.routes().remove(host)
    }

    pub fn lookup(&self, host: &str) -> Option<IpAddr> {
        self.routes().get(host).copied()
    }

    /// Drops every override.
    pub fn teardown(&self) {
        let mut routes = self.routes();
        debug!(count = routes.len(), "tearing down route overrides");
        routes.clear();
    }

    /// `http://{host}{path}`, for a route host that has an override installed.
    pub fn route_url(&self, host: &str, path: &str) -> Result<String> {
        if host.is_empty() {
            return Err(ProxyError::configuration("route host is empty"));
        }

        let name = host.split_once(':').map_or(host, |(name, _)| name);
        if self.lookup(name).is_none() {
            return Err(ProxyError::configuration(format!(
                "route `{name}` has no installed address"
            )));
        }

        Ok(format!("http://{host}{path}"))
    }
}

impl Resolve for RouteNameContext {
    fn resolve(&self, name: Name) -> Resolving {
        let installed = self.lookup(name.as_str());

        Box::pin(async move {
            if let Some(address) = installed {
                trace!(name = name.as_str(), %address, "resolved through route override");
                let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(address, 0)));
                return Ok(addrs);
            }

            let resolved: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0))
                .await?
                .collect();
            Ok::<Addrs, BoxError>(Box::new(resolved.into_iter()))
        })
    }
}

/// Removes a single route override on drop.
#[derive(Debug)]
pub struct RouteGuard {
    context: RouteNameContext,
    host: String,
}

impl RouteGuard {
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.context.remove(&self.host);
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn lifecycle() {
        let context = RouteNameContext::new();
        context.install("web.apps.test", LOCALHOST).unwrap();

        let shared = context.clone();
        assert_eq!(shared.lookup("web.apps.test"), Some(LOCALHOST));

        {
            let guard = shared.scoped("api.apps.test", LOCALHOST).unwrap();
            assert_eq!(guard.host(), "api.apps.test");
            assert_eq!(context.lookup("api.apps.test"), Some(LOCALHOST));
        }
        assert_eq!(context.lookup("api.apps.test"), None);

        context.teardown();
        assert_eq!(shared.lookup("web.apps.test"), None);
    }

    #[test]
    fn route_url_requires_an_installed_host() {
        let context = RouteNameContext::new();

        assert!(matches!(
            context.route_url("", "/health"),
            Err(ProxyError::Configuration(_))
        ));
        assert!(matches!(
            context.route_url("web.apps.test", "/health"),
            Err(ProxyError::Configuration(_))
        ));
        assert!(matches!(
            context.install("", LOCALHOST),
            Err(ProxyError::Configuration(_))
        ));

        context.install("web.apps.test", LOCALHOST).unwrap();
        assert_eq!(
            context.route_url("web.apps.test:8080", "/health").unwrap(),
            "http://web.apps.test:8080/health"
        );
    }

    #[tokio::test]
    async fn client_resolves_through_the_context() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let context = RouteNameContext::new();
        let _guard = context.scoped("web.apps.test", LOCALHOST).unwrap();

        cubeproxy_kube::crypto::install_crypto_provider();
        let client = reqwest::Client::builder()
            .dns_resolver(Arc::new(context.clone()))
            .build()
            .unwrap();

        let host = format!("web.apps.test:{}", server.address().port());
        let url = context.route_url(&host, "/health").unwrap();
        let body = client.get(url).send().await.unwrap().text().await.unwrap();

        assert_eq!(body, "ok");
    }
}
