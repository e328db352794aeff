//! Logging setup for the Encuentro binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crates (`encuentro_client`, `encuentro_shared`) and the
/// binary get the default level. `RUST_LOG` overrides everything.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "encuentro_client")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use encuentro_shared::logger::setup_logger;
///
/// setup_logger("encuentro_client", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_directives(binary_name, default_log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "{}={},encuentro_client={},{}={}",
        env!("CARGO_PKG_NAME").replace("-", "_"),
        default_log_level,
        default_log_level,
        binary_name.replace("-", "_"),
        default_log_level
    )
}
