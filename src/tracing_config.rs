//! Logging setup for the command line tool.
//!
//! The subscriber is only installed when `HEAP_SNAPSHOT_LOG` (or `RUST_LOG`)
//! is set. Both take the usual filter syntax:
//!
//! ```bash
//! HEAP_SNAPSHOT_LOG=debug heap-snapshot-graph -i app.heapsnapshot
//! HEAP_SNAPSHOT_LOG="heap_snapshot_graph::analysis=debug" heap-snapshot-graph -i app.heapsnapshot
//! ```

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "HEAP_SNAPSHOT_LOG";

/// `HEAP_SNAPSHOT_LOG` wins over `RUST_LOG` when both are set.
fn build_filter() -> EnvFilter {
    match std::env::var(LOG_ENV_VAR) {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Installs a plain text subscriber writing to stderr, so reports on stdout
/// stay machine readable.
pub fn init_tracing() {
    let has_own_var = std::env::var(LOG_ENV_VAR).is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_own_var && !has_rust_log {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(build_filter())
        .with_writer(std::io::stderr)
        .init();
}
