//! Where pods come from.
//!
//! [`PodDirectory`] is the only boundary to the cluster: everything above it (the
//! [`PodResolver`](crate::resolver::PodResolver), the proxy) works on [`PodRef`]s and never
//! touches a client library type.

use crate::{error::Result, pod::PodRef, selector::LabelSelector};

pub mod cluster;
pub mod fixed;
pub mod rest;

pub use cluster::KubePodDirectory;
pub use fixed::FixedPodDirectory;
pub use rest::RestPodDirectory;

pub trait PodDirectory {
    /// Lists the live pods in `namespace` whose labels satisfy `selector`, in the order the
    /// backing store returns them.
    ///
    /// Every call lists again, nothing is cached. Failures are returned as they are, without
    /// retries.
    #[allow(async_fn_in_trait)]
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodRef>>;
}

impl<D> PodDirectory for &D
where
    D: PodDirectory,
{
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodRef>> {
        (**self).list_pods(namespace, selector).await
    }
}
