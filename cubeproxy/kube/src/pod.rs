use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;

use crate::error::{KubeApiError, Result};

/// Condition type that carries the pod's readiness.
pub const READY_CONDITION: &str = "Ready";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl FromStr for PodPhase {
    type Err = std::convert::Infallible;

    /// Anything the API reports that we don't know is [`PodPhase::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };
        f.write_str(phase)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodCondition {
    pub type_: String,
    /// `"True"`, `"False"` or `"Unknown"`.
    pub status: String,
}

/// Snapshot of a pod as seen by a single directory listing.
///
/// Never kept around between resolutions: pods matched by labels come and go, so every
/// operation re-lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodRef {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub phase: PodPhase,
    pub conditions: Vec<PodCondition>,
    /// Set once the pod is terminating.
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl PodRef {
    pub fn new<N: Into<String>>(name: N) -> Self {
        PodRef {
            name: name.into(),
            labels: Default::default(),
            phase: PodPhase::Unknown,
            conditions: Vec::new(),
            deletion_timestamp: None,
        }
    }

    pub fn with_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_phase(mut self, phase: PodPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_condition<T: Into<String>, S: Into<String>>(mut self, type_: T, status: S) -> Self {
        self.conditions.push(PodCondition {
            type_: type_.into(),
            status: status.into(),
        });
        self
    }

    pub fn with_deletion_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.deletion_timestamp = Some(timestamp);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the pod is prepared to serve traffic.
    ///
    /// Checked in this order, first match decides:
    /// 1. pod is terminating → not ready;
    /// 2. phase is not `Running` → not ready;
    /// 3. first `Ready` condition has status `True` (any case) → ready, otherwise not;
    /// 4. no `Ready` condition → not ready.
    pub fn is_ready(&self) -> bool {
        if self.deletion_timestamp.is_some() {
            return false;
        }

        if self.phase != PodPhase::Running {
            return false;
        }

        self.conditions
            .iter()
            .find(|condition| condition.type_ == READY_CONDITION)
            .is_some_and(|condition| condition.status.eq_ignore_ascii_case("true"))
    }
}

impl TryFrom<&Pod> for PodRef {
    type Error = KubeApiError;

    fn try_from(pod: &Pod) -> Result<Self> {
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| KubeApiError::missing_field(None, ".metadata.name"))?;

        let status = pod.status.as_ref();

        let phase = status
            .and_then(|status| status.phase.as_deref())
            .map(|phase| phase.parse::<PodPhase>().unwrap_or_default())
            .unwrap_or_default();

        let conditions = status
            .and_then(|status| status.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|condition| PodCondition {
                        type_: condition.type_.clone(),
                        status: condition.status.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PodRef {
            name,
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            phase,
            conditions,
            deletion_timestamp: pod
                .metadata
                .deletion_timestamp
                .as_ref()
                .map(|time| time.0),
        })
    }
}
