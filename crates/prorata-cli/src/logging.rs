use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` controls the filter (default `warn`); `--verbose` forces
/// `debug`. Logs go to stderr so stdout stays machine-readable.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}
