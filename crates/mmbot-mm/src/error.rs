//! Strategy error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MmError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid strategy configuration: {0}")]
    InvalidConfig(String),
}

pub type MmResult<T> = Result<T, MmError>;
