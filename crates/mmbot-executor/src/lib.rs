//! Order execution for mmbot.
//!
//! [`OrderLifecycleManager`] owns the two working quote orders (one bid, one
//! ask) and replaces them every cycle: one cancel-all, then up to two fresh
//! GTC limit orders rounded to the configured precision.

pub mod error;
pub mod lifecycle;
pub mod precision;

pub use error::{ExecutorError, ExecutorResult};
pub use lifecycle::{OrderLifecycleManager, RefreshOutcome, SideOutcome};
pub use precision::OrderPrecision;
