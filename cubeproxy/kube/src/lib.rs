#![warn(clippy::indexing_slicing)]
//! Pod discovery: listing pods by label, deciding readiness and picking the pod to talk to.

pub mod crypto;
pub mod directory;
pub mod error;
pub mod pod;
pub mod resolver;
pub mod selector;

pub use directory::{FixedPodDirectory, KubePodDirectory, PodDirectory, RestPodDirectory};
pub use error::{KubeApiError, Result};
pub use pod::{PodCondition, PodPhase, PodRef};
pub use resolver::{PodProbe, PodResolver};
pub use selector::LabelSelector;
