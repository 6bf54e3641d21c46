//! Periodic poll loop.
//!
//! [`Scheduler::run`] calls [`poll_once`] immediately and then once per
//! interval until shutdown fires. A failed cycle is logged and the loop keeps
//! going; the next tick is the retry.

use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::poller::{poll_once, FeedSource, FeedStore, PollError};
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("Invalid interval {0:?}: expected a duration such as \"1m30s\"")]
    InvalidInterval(String),
}

/// Parses a duration string such as `"1m30s"`, `"1.5h"` or `"500ms"`.
///
/// The input is one or more `<number><unit>` groups, where the number may
/// have a fractional part and the unit is one of `ns`, `us` (or `µs`), `ms`,
/// `s`, `m`, `h`. A leading `+` is accepted. Fractions finer than a
/// nanosecond are truncated.
///
/// # Errors
///
/// [`IntervalError::InvalidInterval`] for empty input, a missing or unknown
/// unit, a negative sign, an overflow, or a total of zero.
///
/// ```
/// use std::time::Duration;
/// use gator::scheduler::parse_interval;
///
/// assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
/// assert!(parse_interval("90").is_err());
/// ```
pub fn parse_interval(input: &str) -> Result<Duration, IntervalError> {
    let invalid = || IntervalError::InvalidInterval(input.to_string());

    let trimmed = input.trim();
    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let nanos_per_unit = unit_nanos(unit).ok_or_else(invalid)?;
        let group = scale_decimal(number, nanos_per_unit).ok_or_else(invalid)?;
        total_nanos = total_nanos.checked_add(group).ok_or_else(invalid)?;
        rest = next;
    }

    if total_nanos == 0 {
        return Err(invalid());
    }
    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid())?;
    let subsec = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60_000_000_000),
        "h" => Some(3_600_000_000_000),
        _ => None,
    }
}

/// `number` (digits with at most one `.`) times `scale`, in integer math.
fn scale_decimal(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;
    let mut place = scale;
    for digit in fraction.bytes() {
        if !digit.is_ascii_digit() {
            return None;
        }
        place /= 10;
        value = value.checked_add(u128::from(digit - b'0') * place)?;
    }
    Some(value)
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drives [`poll_once`] at a fixed interval.
///
/// At most one cycle is in flight: a tick that comes due while a cycle is
/// still running is delayed, not queued up.
pub struct Scheduler<S, F> {
    store: S,
    source: F,
    interval: Duration,
}

impl<S: FeedStore, F: FeedSource> Scheduler<S, F> {
    /// # Errors
    ///
    /// [`IntervalError::InvalidInterval`] when `interval` is zero.
    pub fn new(store: S, source: F, interval: Duration) -> Result<Self, IntervalError> {
        if interval.is_zero() {
            return Err(IntervalError::InvalidInterval(format!("{:?}", interval)));
        }
        Ok(Self {
            store,
            source,
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until `shutdown` fires. Returns the number of cycles started.
    ///
    /// An in-flight fetch is abandoned as soon as shutdown fires; items
    /// already stored stay stored.
    pub async fn run(&self, shutdown: Shutdown) -> u64 {
        tracing::info!(interval = ?self.interval, "Collecting feeds");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            match poll_once(&self.store, &self.source, &shutdown).await {
                Ok(report) if report.interrupted => {
                    tracing::debug!(feed = %report.feed_url, "Cycle interrupted by shutdown");
                }
                Ok(_) => {}
                Err(PollError::NoFeedsRegistered) => {
                    tracing::warn!("No feeds registered, nothing to poll");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Poll cycle failed");
                }
            }
        }

        tracing::info!(cycles, "Poll loop stopped");
        cycles
    }
}
