//! Tracing setup for pipeline runs.
//!
//! The orchestrator emits structured events through [`tracing`] at every
//! stage transition (dispatch, accept, reject, retry, skip, cancel). This
//! module wires a subscriber for binaries and tests that want to see them;
//! library consumers with their own subscriber should skip it.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a global subscriber honoring `RUST_LOG`.
///
/// Defaults to `info` for this crate when `RUST_LOG` is unset. Safe to call
/// more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stagegate=info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Initializes a JSON-formatted subscriber for machine-readable logs.
pub fn init_json_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stagegate=info"));

    let _ = fmt()
        .json()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
