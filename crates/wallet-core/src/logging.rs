use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::WalletError;

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), WalletError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| WalletError::Config(format!("logging.level: {e}")))?,
    };

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    result.map_err(|e| WalletError::Config(format!("logging already initialised: {e}")))
}
