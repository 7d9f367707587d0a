//! Exchange error types.

use thiserror::Error;

/// Binance: unknown order sent / no open orders to cancel.
const CODE_UNKNOWN_ORDER: i64 = -2011;
/// Binance: too many requests.
const CODE_TOO_MANY_REQUESTS: i64 = -1003;
/// Binance: signature for this request is not valid.
const CODE_BAD_SIGNATURE: i64 = -1022;
/// Binance: API-key format invalid.
const CODE_BAD_API_KEY_FMT: i64 = -2014;
/// Binance: invalid API-key, IP, or permissions for action.
const CODE_REJECTED_MBX_KEY: i64 = -2015;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Transport failure before a response was received (connect, timeout).
    #[error("HTTP transport error: {0}")]
    Http(String),

    /// The exchange answered with a non-success status.
    #[error("API error (status {status}, code {code:?}): {msg}")]
    Api {
        status: u16,
        code: Option<i64>,
        msg: String,
    },

    /// A success response whose body could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP client setup failed: {0}")]
    ClientBuild(String),
}

impl ExchangeError {
    fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Cancel-all found nothing to cancel. Callers treat this as success.
    #[must_use]
    pub fn is_nothing_to_cancel(&self) -> bool {
        self.api_code() == Some(CODE_UNKNOWN_ORDER)
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.http_status(), Some(429 | 418))
            || self.api_code() == Some(CODE_TOO_MANY_REQUESTS)
    }

    /// Credential or signature problems. Retrying cannot succeed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.http_status(), Some(401 | 403))
            || matches!(
                self.api_code(),
                Some(CODE_BAD_SIGNATURE | CODE_BAD_API_KEY_FMT | CODE_REJECTED_MBX_KEY)
            )
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
