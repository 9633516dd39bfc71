//! Injectable time source.
//!
//! Every expiry comparison in the service goes through a [`Clock`] so tests
//! can pin the instant; issued token claims use the same source.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(now_epoch_seconds)
}

pub fn fixed_clock(now: i64) -> Clock {
    Arc::new(move || now)
}

pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
