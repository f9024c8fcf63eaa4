use std::{future::Future, time::Duration};

use cubeproxy_config::RetryConfig;
use http::StatusCode;
use tokio_retry::{strategy::FixedInterval, RetryIf};

use crate::error::{ProxyError, Result};

/// How many times an RPC call is attempted, and what counts as a successful attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. `0` behaves like `1`.
    pub max_attempts: u32,

    /// Fixed sleep between a failed attempt and the next one.
    pub delay: Duration,

    /// When set, only a response with this status ends the retry loop. When unset, any response
    /// does.
    pub desired_status_code: Option<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(1),
            desired_status_code: None,
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = ProxyError;

    fn try_from(config: &RetryConfig) -> Result<Self> {
        let desired_status_code = config
            .desired_status_code
            .map(|code| {
                StatusCode::from_u16(code).map_err(|_| {
                    ProxyError::configuration(format!("`{code}` is not a valid status code"))
                })
            })
            .transpose()?;

        Ok(RetryPolicy {
            max_attempts: config.max_attempts,
            delay: config.delay,
            desired_status_code,
        })
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub fn once() -> Self {
        RetryPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
            desired_status_code: None,
        }
    }

    pub fn with_desired_status(mut self, status: StatusCode) -> Self {
        self.desired_status_code = Some(status);
        self
    }

    /// Runs `action` until it succeeds, `condition` rejects its error, or the attempts run out.
    ///
    /// The last error is returned as is.
    pub async fn run<A, F, T, E, C>(&self, action: A, condition: C) -> std::result::Result<T, E>
    where
        A: FnMut() -> F,
        F: Future<Output = std::result::Result<T, E>>,
        C: FnMut(&E) -> bool,
    {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        let strategy = FixedInterval::new(self.delay).take(retries);

        RetryIf::start(strategy, action, condition).await
    }
}
