use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable. HTTP and Telegram client
/// internals are noisy at debug.
pub const DEFAULT_DIRECTIVES: &str = "debug,reqwest=warn,hyper=warn,hyper_util=warn,teloxide=warn";

pub type LoggerError = Box<dyn Error + Send + Sync + 'static>;

pub fn setup_logger() {
    if let Err(e) = try_setup_logger(DEFAULT_DIRECTIVES) {
        eprintln!("Logger already initialised: {}", e);
    }
}

/// Installs the global compact subscriber. Fails if one is already set.
pub fn try_setup_logger(fallback: &str) -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(filter)
        .try_init()
}
