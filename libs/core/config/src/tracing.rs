use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre for binaries. Safe to call more than once.
///
/// Reports show the error location but not the environment section.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize the global tracing subscriber.
///
/// - **Production** (`APP_ENV=production`): flattened JSON lines, defaults to `info`.
/// - **Development**: pretty output, defaults to `debug`.
///
/// `RUST_LOG` overrides the default directives. The registry also carries
/// `tracing_error::ErrorLayer` so `eyre` reports include span traces.
/// librdkafka client logs reach this subscriber through the Kafka client
/// context in `kafka-worker`, which re-emits them as tracing events.
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn init_tracing(environment: &Environment) {
    let filter = env_filter(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping"),
    }
}

/// `RUST_LOG` when set, otherwise `info` in production and `debug` elsewhere
pub(crate) fn env_filter(environment: &Environment) -> EnvFilter {
    let default_directives = if environment.is_production() {
        "info"
    } else {
        "debug"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}
