//! Tracing subscriber setup for binaries and replays.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "confluence_core=info,confluence_runner=info";

/// Install a global subscriber. `RUST_LOG` overrides the default filter and
/// `CONFLUENCE_LOG_JSON` switches to JSON lines. A second call is a no-op.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json_logging = std::env::var("CONFLUENCE_LOG_JSON").is_ok();

    let result = if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init()
    } else {
        fmt().with_env_filter(env_filter).with_target(true).try_init()
    };
    // Already installed (tests, embedding hosts).
    let _ = result;
}
