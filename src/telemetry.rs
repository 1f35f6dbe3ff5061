use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: `RUST_LOG` filter (default `info`),
/// formatted to stderr so stdout stays reserved for command output.
///
/// Calling it twice is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}
