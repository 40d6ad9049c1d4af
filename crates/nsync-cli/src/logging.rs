//! Installs the process-wide tracing subscriber.

use tracing_subscriber::EnvFilter;

/// Filter precedence: `RUST_LOG`, then `--verbose`, then the configured
/// level. Output goes to stderr so stdout stays parseable.
pub fn init(verbose: bool, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
