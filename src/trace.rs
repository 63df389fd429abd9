use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ORAVERIFY_LOG";

/// Installs the stderr diagnostics subscriber.
///
/// `ORAVERIFY_LOG` takes a standard filter directive (`debug`, `oraverify::gateway=trace`).
/// Without it the level is `warn`, or `debug` with `--verbose`. Safe to call twice; the
/// second call is a no-op.
pub fn init(verbose: bool, color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(true)
        .without_time()
        .try_init();
}
