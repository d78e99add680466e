//! Retention policy: window size + cadence -> what to do with one round notification.
//!
//! `decide` is pure. The manager owns the notification counter and feeds the
//! value it had *before* the current notification was counted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RetentionConfig;

const ONCE: i64 = -1;
const DISABLED: i64 = 0;

/// How often, in received notifications, a cleanup is due.
///
/// Serialized as a signed integer: `-1` once, `0` disabled, `n > 0` every `n`
/// notifications. Anything below `-1` is kept as `Invalid` and rejected by
/// `decide` the first time a decision is actually needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Cadence {
    Once,
    #[default]
    Disabled,
    Periodic(u64),
    Invalid(i64),
}

impl From<i64> for Cadence {
    fn from(v: i64) -> Self {
        match v {
            ONCE => Cadence::Once,
            DISABLED => Cadence::Disabled,
            n if n > 0 => Cadence::Periodic(n as u64),
            n => Cadence::Invalid(n),
        }
    }
}

impl From<Cadence> for i64 {
    fn from(c: Cadence) -> Self {
        match c {
            Cadence::Once => ONCE,
            Cadence::Disabled => DISABLED,
            Cadence::Periodic(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Cadence::Invalid(n) => n,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Once => write!(f, "once"),
            Cadence::Disabled => write!(f, "disabled"),
            Cadence::Periodic(n) => write!(f, "every {} rounds", n),
            Cadence::Invalid(n) => write!(f, "invalid({})", n),
        }
    }
}

/// Outcome of evaluating the policy for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do for this notification.
    Skip,
    /// Delete everything below the cutoff and keep listening.
    DeleteAndContinue(u64),
    /// Delete everything below the cutoff, then terminate.
    DeleteAndStop(u64),
    /// Retention is disabled; terminate without touching the store.
    Stop,
    /// Cadence is out of range; terminate without touching the store.
    Fatal,
}

/// Oldest round that must be kept when `round` is the latest round, or `None`
/// while the window has not filled yet.
pub fn cutoff(round: u64, window: u64) -> Option<u64> {
    if round <= window {
        return None;
    }
    Some(round - window + 1)
}

/// Evaluate the policy. `counter` is the number of notifications received
/// before this one.
///
/// The first notification (`counter == 0`) always prunes for `Once` and
/// `Periodic`, independent of where `counter` lands relative to the period.
pub fn decide(config: &RetentionConfig, counter: u64, round: u64) -> Decision {
    let Some(keep) = cutoff(round, config.rounds) else {
        return Decision::Skip;
    };

    match config.interval {
        // a zero period can only be built by hand; it means disabled
        Cadence::Disabled | Cadence::Periodic(0) => Decision::Stop,
        Cadence::Once if counter == 0 => Decision::DeleteAndStop(keep),
        Cadence::Periodic(_) if counter == 0 => Decision::DeleteAndContinue(keep),
        Cadence::Periodic(n) if counter % n == 0 => Decision::DeleteAndContinue(keep),
        Cadence::Invalid(_) => Decision::Fatal,
        _ => Decision::Skip,
    }
}
