#![warn(clippy::indexing_slicing)]
//! Calls into code running inside Kubernetes pods, through the API server's pod proxy.
//!
//! A [`PodProxy`] resolves a label selector to a pod (see [`cubeproxy_kube`]), builds the proxy
//! URL for it and POSTs bincode framed objects there, retrying as its [`RetryPolicy`] says.
//!
//! ```no_run
//! # async fn run() -> cubeproxy_proxy::Result<()> {
//! use cubeproxy_config::ProxyConfig;
//! use cubeproxy_kube::LabelSelector;
//! use cubeproxy_proxy::PodProxy;
//!
//! let config = ProxyConfig::from_env()?;
//! let proxy = PodProxy::from_config(&config)?;
//!
//! let selector = LabelSelector::new().with("app", "web");
//! proxy.await_ready(&selector).await?;
//!
//! let _result: Option<String> = proxy
//!     .call(&selector, 0, "/ArquillianServletRunner", None, Some(&"WebIT".to_owned()))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod pod_proxy;
pub mod probe;
pub mod retry;
pub mod route;
pub mod transport;
pub mod url;

pub use client::build_client;
pub use envelope::{RpcEnvelope, RpcMessage};
pub use error::{ProxyError, Result};
pub use pod_proxy::PodProxy;
pub use probe::HttpProbe;
pub use retry::RetryPolicy;
pub use route::{RouteGuard, RouteNameContext};
pub use transport::RpcTransport;
pub use url::{build_port_query_url, build_url, ProxyTarget};
