use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    from_env::FromEnv, source::ConfigSource, ConfigContext, ConfigError, GenerateConfig, Result,
};

/// # `readiness`
///
/// Polling used while waiting for a pod matching the labels to become ready.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessFileConfig {
    pub attempts: Option<u32>,
    pub interval_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

impl GenerateConfig for ReadinessFileConfig {
    type Generated = ReadinessConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        let defaults = ReadinessConfig::default();

        let attempts = FromEnv::new("CUBEPROXY_READINESS_ATTEMPTS")
            .or(self.attempts)
            .source_value(context)
            .transpose()?
            .unwrap_or(defaults.attempts);
        if attempts == 0 {
            return Err(ConfigError::InvalidValue(
                attempts.to_string(),
                "readiness.attempts",
            ));
        }

        let interval = FromEnv::new("CUBEPROXY_READINESS_INTERVAL_SECS")
            .or(self.interval_secs)
            .source_value(context)
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);

        Ok(ReadinessConfig { attempts, interval })
    }
}
