use std::time::Duration;

use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{debug, trace};

use crate::{
    directory::PodDirectory,
    error::{KubeApiError, Result},
    pod::PodRef,
    selector::LabelSelector,
};

/// Checks that a pod actually serves, beyond what its status says.
///
/// Used by [`PodResolver::find_first_ready_by_probe`], for workloads whose `Ready` condition
/// turns true before the application behind it answers.
pub trait PodProbe {
    #[allow(async_fn_in_trait)]
    async fn probe(&self, namespace: &str, pod: &PodRef) -> bool;
}

/// Turns `(namespace, labels)` into a concrete pod.
///
/// Holds no state besides the directory: every call lists the pods again, and nothing stops the
/// pod returned here from going away before the caller uses it.
#[derive(Clone, Debug)]
pub struct PodResolver<D> {
    directory: D,
}

/// Outcome of a single readiness poll in [`PodResolver::await_ready`].
enum ReadyPoll {
    NotReady,
    Failed(KubeApiError),
}

impl<D> PodResolver<D>
where
    D: PodDirectory,
{
    pub fn new(directory: D) -> Self {
        PodResolver { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Pod at `index` among the pods matching `selector`, in the directory's listing order.
    ///
    /// The order is whatever the directory returns, no sorting happens here, so the same index
    /// can name another pod after pods get rescheduled.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn resolve_by_index(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        index: usize,
    ) -> Result<PodRef> {
        let pods = self.directory.list_pods(namespace, selector).await?;
        let count = pods.len();

        pods.into_iter()
            .nth(index)
            .ok_or_else(|| KubeApiError::NotEnoughPods {
                index,
                count,
                namespace: namespace.to_owned(),
                selector: selector.to_string(),
            })
    }

    /// First pod, in listing order, whose status says it is ready.
    #[tracing::instrument(level = "trace", skip(self), err)]
    pub async fn find_first_ready(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Option<PodRef>> {
        Ok(self
            .directory
            .list_pods(namespace, selector)
            .await?
            .into_iter()
            .find(PodRef::is_ready))
    }

    /// Probes the matching pods one by one, in listing order, and returns the first that
    /// answers together with its index. Pods after it are not probed.
    #[tracing::instrument(level = "debug", skip(self, probe), err)]
    pub async fn find_first_ready_by_probe<P>(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        probe: &P,
    ) -> Result<(usize, PodRef)>
    where
        P: PodProbe,
    {
        let pods = self.directory.list_pods(namespace, selector).await?;

        for (index, pod) in pods.into_iter().enumerate() {
            if probe.probe(namespace, &pod).await {
                debug!(index, pod = %pod.name, "pod answered probe");
                return Ok((index, pod));
            }

            trace!(index, pod = %pod.name, "pod did not answer probe");
        }

        Err(KubeApiError::NoReadyPod {
            namespace: namespace.to_owned(),
            selector: selector.to_string(),
        })
    }

    /// Polls [`Self::find_first_ready`] up to `attempts` times, `interval` apart.
    ///
    /// A failing directory ends the wait right away, only "no ready pod yet" is polled again.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn await_ready(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        attempts: u32,
        interval: Duration,
    ) -> Result<PodRef> {
        let strategy = FixedInterval::new(interval).take(attempts.saturating_sub(1) as usize);

        RetryIf::start(
            strategy,
            || self.poll_ready(namespace, selector),
            |poll: &ReadyPoll| matches!(poll, ReadyPoll::NotReady),
        )
        .await
        .map_err(|poll| match poll {
            ReadyPoll::NotReady => KubeApiError::ReadyTimeout {
                namespace: namespace.to_owned(),
                selector: selector.to_string(),
                attempts: attempts.max(1),
            },
            ReadyPoll::Failed(error) => error,
        })
    }

    async fn poll_ready(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<PodRef, ReadyPoll> {
        match self.find_first_ready(namespace, selector).await {
            Ok(Some(pod)) => Ok(pod),
            Ok(None) => Err(ReadyPoll::NotReady),
            Err(error) => Err(ReadyPoll::Failed(error)),
        }
    }

    /// Names of the matching pods, in listing order.
    pub async fn pod_names(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<String>> {
        Ok(self
            .directory
            .list_pods(namespace, selector)
            .await?
            .into_iter()
            .map(|pod| pod.name)
            .collect())
    }
}
