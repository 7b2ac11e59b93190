//! Wall-clock access that works both in the browser and natively.
//!
//! `std::time::SystemTime::now()` panics on `wasm32-unknown-unknown`, so the
//! hydrate build reads `Date.now()` instead.

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    #[cfg(feature = "hydrate")]
    {
        #[allow(clippy::cast_possible_truncation)]
        let now = js_sys::Date::now() as i64;
        now
    }
    #[cfg(not(feature = "hydrate"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Whether a timestamp taken at `checked_at_ms` is still within `ttl_ms` of `now_ms`.
#[must_use]
pub fn is_fresh(checked_at_ms: i64, now_ms: i64, ttl_ms: i64) -> bool {
    let age = now_ms.saturating_sub(checked_at_ms);
    (0..ttl_ms).contains(&age)
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
