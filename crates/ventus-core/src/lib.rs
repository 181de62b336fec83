pub mod config;
pub mod error;
pub mod fetch_state;

pub use config::{
    ApiConfig, Config, ConfigValidationError, IssuesConfig, RetrySettings, ValidationResult,
    API_KEY_ENV,
};
pub use error::{
    AppError, AuthError, ConfigError, IssueError, NetworkError, ReqwestErrorExt,
};
pub use fetch_state::FetchPhase;

use anyhow::Result;

/// Initialize the core: installs the tracing subscriber.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Ventus core initialized");
    Ok(())
}
