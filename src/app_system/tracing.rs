use tracing_subscriber::{fmt::time::uptime, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(uptime())
        .compact()
        .init();
}
