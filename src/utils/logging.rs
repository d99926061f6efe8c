//! Logging initialization
//!
//! Simple tracing setup that respects the RUST_LOG environment variable,
//! falls back to an explicit filter (typically from config), and defaults
//! to "info".

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for the process
///
/// # Arguments
/// * `filter` - Optional log filter (e.g. "info", "relay_node=debug").
///              RUST_LOG takes precedence when set.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter.unwrap_or("info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter)
        .init();
}
