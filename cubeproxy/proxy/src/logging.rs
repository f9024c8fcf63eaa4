use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, util::TryInitError, EnvFilter};

/// Set to `true` to log JSON lines instead of the compact text format.
pub const CUBEPROXY_JSON_LOG_ENV: &str = "CUBEPROXY_JSON_LOG";

/// Installs the global subscriber, writing to stderr and filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set, so embedding test harnesses keep theirs.
pub fn init_tracing() -> Result<(), TryInitError> {
    let json_log = std::env::var(CUBEPROXY_JSON_LOG_ENV)
        .map(|json_log| json_log.parse().unwrap_or_default())
        .unwrap_or(false);

    if json_log {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .with(EnvFilter::from_default_env())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .with(EnvFilter::from_default_env())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        // Either this call or another test's installed the subscriber first.
        let _ = init_tracing();

        assert!(init_tracing().is_err());
    }
}
