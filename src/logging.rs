//! Tracing subscriber setup for the `docvault` binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "docvault=info,tower_http=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default
/// directives; output goes to stderr so stdout stays free for command output.
///
/// Calling this twice is harmless: the second install is ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}
