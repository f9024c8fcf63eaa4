use std::sync::{Arc, Mutex, PoisonError};

use super::PodDirectory;
use crate::{error::Result, pod::PodRef, selector::LabelSelector};

/// In-memory directory, keyed by namespace.
///
/// Clones share the same pods, so a test can keep a handle and change the pods between two
/// calls of the code under test (a pod turning ready, a pod being replaced).
#[derive(Clone, Debug, Default)]
pub struct FixedPodDirectory {
    pods: Arc<Mutex<Vec<(String, PodRef)>>>,
}

impl FixedPodDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod<N: Into<String>>(self, namespace: N, pod: PodRef) -> Self {
        self.insert(namespace, pod);
        self
    }

    pub fn insert<N: Into<String>>(&self, namespace: N, pod: PodRef) {
        self.pods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((namespace.into(), pod));
    }

    /// Replaces every pod of `namespace` that has the same name as `pod`.
    pub fn replace<N: AsRef<str>>(&self, namespace: N, pod: PodRef) {
        let mut pods = self.pods.lock().unwrap_or_else(PoisonError::into_inner);
        for (pod_namespace, existing) in pods.iter_mut() {
            if pod_namespace == namespace.as_ref() && existing.name == pod.name {
                *existing = pod.clone();
            }
        }
    }

    pub fn remove<N: AsRef<str>>(&self, namespace: N, name: &str) {
        self.pods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(pod_namespace, pod)| {
                !(pod_namespace == namespace.as_ref() && pod.name == name)
            });
    }
}

impl PodDirectory for FixedPodDirectory {
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodRef>> {
        Ok(self
            .pods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(pod_namespace, pod)| {
                pod_namespace == namespace && selector.matches(&pod.labels)
            })
            .map(|(_, pod)| pod.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_by_namespace_and_labels_in_insertion_order() {
        let directory = FixedPodDirectory::new()
            .with_pod("myns", PodRef::new("web-b").with_label("app", "web"))
            .with_pod("myns", PodRef::new("db-a").with_label("app", "db"))
            .with_pod("other", PodRef::new("web-x").with_label("app", "web"))
            .with_pod(
                "myns",
                PodRef::new("web-a")
                    .with_label("app", "web")
                    .with_label("tier", "front"),
            );

        let pods = directory
            .list_pods("myns", &LabelSelector::new().with("app", "web"))
            .await
            .unwrap();

        let names: Vec<_> = pods.iter().map(PodRef::name).collect();
        assert_eq!(names, ["web-b", "web-a"]);
    }

    #[tokio::test]
    async fn clones_see_changes() {
        let directory = FixedPodDirectory::new();
        let handle = directory.clone();

        handle.insert("myns", PodRef::new("web-a"));
        assert_eq!(
            directory
                .list_pods("myns", &LabelSelector::new())
                .await
                .unwrap()
                .len(),
            1
        );

        handle.remove("myns", "web-a");
        assert!(directory
            .list_pods("myns", &LabelSelector::new())
            .await
            .unwrap()
            .is_empty());
    }
}
