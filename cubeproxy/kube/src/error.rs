use thiserror::Error;

pub type Result<T, E = KubeApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum KubeApiError {
    #[error("Kube failed: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Request to the cluster API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Listing pods at `{url}` failed with status {status}: {message}")]
    ListFailed {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Failed to infer Kube config: {0}")]
    InferKubeConfigError(#[from] kube::config::InferConfigError),

    #[error("Failed to load Kube config: {0}")]
    KubeConfigPathError(#[from] kube::config::KubeconfigError),

    #[error("Path expansion for kubeconfig failed: {0}")]
    ConfigPathExpansionError(String),

    #[error("Pod `{}` is missing field `{field}`", name.as_deref().unwrap_or("<unnamed>"))]
    MissingField {
        name: Option<String>,
        field: &'static str,
    },

    #[error(
        "Pod index {index} requested but only {count} pod(s) match labels `{selector}` in namespace `{namespace}`"
    )]
    NotEnoughPods {
        index: usize,
        count: usize,
        namespace: String,
        selector: String,
    },

    #[error("No pod matching labels `{selector}` in namespace `{namespace}` answered the probe")]
    NoReadyPod { namespace: String, selector: String },

    #[error(
        "No pod matching labels `{selector}` in namespace `{namespace}` became ready after {attempts} attempt(s)"
    )]
    ReadyTimeout {
        namespace: String,
        selector: String,
        attempts: u32,
    },
}

impl KubeApiError {
    pub fn missing_field(name: Option<&str>, field: &'static str) -> Self {
        KubeApiError::MissingField {
            name: name.map(ToOwned::to_owned),
            field,
        }
    }
}
