// Logging setup shared by binaries embedding the dispatcher
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,switchboard_core=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG` (or `default_filter`).
///
/// Metrics recorded by the dispatcher go to the global OpenTelemetry meter
/// and are dropped unless the host installs a meter provider.
pub fn init_logging(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    info!(target: "telemetry", filter = %default_filter, "Logging initialized");
    Ok(())
}
