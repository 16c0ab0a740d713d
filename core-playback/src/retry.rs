//! # Bounded Retry Primitive
//!
//! One reusable retry loop for every "poll and try again" site in the core:
//! transient resolver failures and seek verification. Attempts and delays are
//! always bounded; nothing here can block playback indefinitely.

use crate::config::PlayerConfig;
use crate::error::Result;
use bridge_traits::EngineHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt and delay bounds for a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        debug_assert!(max_attempts > 0);
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Run `op` until it succeeds, `should_retry` declines, or attempts run out.
///
/// The attempt index (starting at 1) is passed to `op` for logging. The last
/// error is returned when the bound is reached.
pub async fn retry_with<T, F, Fut, P>(
    policy: RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&crate::error::PlayerError) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && should_retry(&err) => {
                debug!(attempt, error = %err, "retrying after transient failure");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Verify that the engine settled near `target` after a seek, re-issuing the
/// seek a bounded number of times.
///
/// Returns `true` when the reported position landed inside the tolerance
/// window. A `false` return is best-effort territory, not an error: playback
/// continues from wherever the engine ended up.
pub async fn verify_seek(
    handle: &Arc<dyn EngineHandle>,
    target: Duration,
    config: &PlayerConfig,
) -> bool {
    let policy = RetryPolicy::new(config.seek_verify_attempts, config.seek_verify_delay);

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.delay).await;

        let reported = match handle.position().await {
            Ok(position) => position,
            Err(err) => {
                debug!(attempt, error = %err, "position poll failed during seek verification");
                continue;
            }
        };

        if within_tolerance(reported, target, config.seek_tolerance) {
            debug!(?reported, ?target, attempt, "seek verified");
            return true;
        }

        debug!(?reported, ?target, attempt, "seek off target, re-seeking");
        if let Err(err) = handle.seek(target).await {
            debug!(attempt, error = %err, "re-seek failed during verification");
        }
    }

    warn!(?target, "seek verification exhausted attempts, continuing best-effort");
    false
}

/// Whether `reported` is within `tolerance` of `target` in either direction.
pub fn within_tolerance(reported: Duration, target: Duration, tolerance: Duration) -> bool {
    let distance = if reported >= target {
        reported - target
    } else {
        target - reported
    };
    distance <= tolerance
}
