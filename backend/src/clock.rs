//! Time source for lifecycle decisions

use chrono::{DateTime, Utc};

/// Supplies the current time to services
///
/// Expiry and dashboard windows are computed against this clock so tests can
/// move time forward without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
