use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    from_env::FromEnv, source::ConfigSource, ConfigContext, ConfigError, GenerateConfig, Result,
};

/// `-1` in `desired_status_code` means any status ends the retry loop.
pub const ANY_STATUS_CODE: i32 = -1;

/// # `retry`
///
/// How calls proxied into a pod are retried.
///
/// ```json
/// {
///   "retry": {
///     "max_attempts": 5,
///     "delay_secs": 1,
///     "desired_status_code": -1
///   }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryFileConfig {
    pub max_attempts: Option<u32>,
    pub delay_secs: Option<u64>,
    pub desired_status_code: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of attempts, never less than 1.
    pub max_attempts: u32,

    /// Fixed sleep between two failed attempts.
    pub delay: Duration,

    /// Status code that ends the retry loop, [`None`] for any.
    pub desired_status_code: Option<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 5,
            delay: Duration::from_secs(1),
            desired_status_code: None,
        }
    }
}

impl GenerateConfig for RetryFileConfig {
    type Generated = RetryConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        let defaults = RetryConfig::default();

        let max_attempts = FromEnv::new("CUBEPROXY_RETRY_MAX_ATTEMPTS")
            .or(self.max_attempts)
            .source_value(context)
            .transpose()?
            .unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                max_attempts.to_string(),
                "retry.max_attempts",
            ));
        }

        let delay = FromEnv::new("CUBEPROXY_RETRY_DELAY_SECS")
            .or(self.delay_secs)
            .source_value(context)
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.delay);

        let desired_status_code = match FromEnv::new("CUBEPROXY_RETRY_DESIRED_STATUS_CODE")
            .or(self.desired_status_code)
            .source_value(context)
            .transpose()?
        {
            None | Some(ANY_STATUS_CODE) => None,
            Some(code @ 100..=599) => Some(code as u16),
            Some(code) => {
                return Err(ConfigError::InvalidValue(
                    code.to_string(),
                    "retry.desired_status_code",
                ))
            }
        };

        Ok(RetryConfig {
            max_attempts,
            delay,
            desired_status_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, None)]
    #[case(Some(-1), None)]
    #[case(Some(200), Some(200))]
    #[case(Some(404), Some(404))]
    fn desired_status_code(#[case] raw: Option<i32>, #[case] expected: Option<u16>) {
        let config = RetryFileConfig {
            desired_status_code: raw,
            ..Default::default()
        }
        .generate_config(&mut ConfigContext::default().strict_env(true))
        .unwrap();

        assert_eq!(config.desired_status_code, expected);
    }

    #[rstest]
    #[case(RetryFileConfig { max_attempts: Some(0), ..Default::default() })]
    #[case(RetryFileConfig { desired_status_code: Some(-2), ..Default::default() })]
    #[case(RetryFileConfig { desired_status_code: Some(1000), ..Default::default() })]
    fn rejects_invalid(#[case] file: RetryFileConfig) {
        let result = file.generate_config(&mut ConfigContext::default().strict_env(true));

        assert!(matches!(result, Err(ConfigError::InvalidValue(..))));
    }
}
