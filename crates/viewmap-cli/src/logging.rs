use anyhow::{Context, Result};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};
use viewmap_core::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level; logs always go to stderr so reports can be piped.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let installed = match config.format.as_str() {
        "json" => {
            let subscriber = Registry::default().with(env_filter()).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
        "pretty" => {
            let subscriber = Registry::default().with(env_filter()).with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
        _ => {
            let subscriber = Registry::default().with(env_filter()).with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    installed.context("Failed to install logging subscriber")
}
