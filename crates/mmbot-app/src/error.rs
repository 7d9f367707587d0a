//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API credentials: set {key_env} and {secret_env}")]
    MissingCredentials { key_env: String, secret_env: String },

    #[error("Exchange error: {0}")]
    Exchange(#[from] mmbot_exchange::ExchangeError),

    #[error("Executor error: {0}")]
    Executor(#[from] mmbot_executor::ExecutorError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] mmbot_mm::MmError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mmbot_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
