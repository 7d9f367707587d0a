//! Executor error types.

use mmbot_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Cancel-all failed for a reason other than "nothing to cancel".
    #[error("Cancel-all failed: {0}")]
    CancelFailed(#[source] ExchangeError),
}

impl ExecutorError {
    /// Underlying exchange error.
    pub fn exchange_error(&self) -> &ExchangeError {
        match self {
            Self::CancelFailed(e) => e,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.exchange_error().is_fatal()
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
