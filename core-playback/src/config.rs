//! # Player Tuning Configuration
//!
//! Timing constants and windows for the control core. The original sources
//! of this design carried several coexisting rewrites with slightly different
//! constants; this struct fixes one consistent, defensive set and is the only
//! place such constants live.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Control-core tuning knobs.
///
/// Every timeout degrades gracefully when exceeded: playback continues
/// best-effort instead of failing the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Back-off subtracted from a resume position so the seek does not land
    /// exactly on a segment boundary (where engines round forward and skip
    /// content).
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_resume_backoff")]
    pub resume_backoff: Duration,

    /// Positions at or below this threshold are used as-is for a quality
    /// switch; above it the back-off applies.
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_switch_backoff_threshold")]
    pub switch_backoff_threshold: Duration,

    /// Maximum wait for a valid video track (or known duration) after an
    /// open, before proceeding best-effort.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_track_wait")]
    pub track_wait: Duration,

    /// Maximum wait for seek-related buffering to settle before a seek is
    /// treated as confirmed anyway.
    ///
    /// Default: 8 seconds.
    #[serde(default = "default_seek_settle_wait")]
    pub seek_settle_wait: Duration,

    /// Accepted distance between the engine-reported position and a seek
    /// target during verification.
    ///
    /// Default: 3 seconds.
    #[serde(default = "default_seek_tolerance")]
    pub seek_tolerance: Duration,

    /// Bounded attempts for the seek verify-and-retry loop.
    ///
    /// Default: 3.
    #[serde(default = "default_seek_verify_attempts")]
    pub seek_verify_attempts: u32,

    /// Delay between seek verification attempts.
    ///
    /// Default: 500 milliseconds.
    #[serde(default = "default_seek_verify_delay")]
    pub seek_verify_delay: Duration,

    /// Quiet period after the last quality-switch request before the switch
    /// executes.
    ///
    /// Default: 350 milliseconds.
    #[serde(default = "default_switch_debounce")]
    pub switch_debounce: Duration,

    /// Continuous buffering beyond this triggers one recovery attempt.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout: Duration,

    /// Minimum position delta between two progress persistence callbacks.
    ///
    /// Default: 500 milliseconds.
    #[serde(default = "default_progress_throttle")]
    pub progress_throttle: Duration,

    /// Delay after a successful load/switch before adjacent qualities are
    /// prefetched into the preload cache.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_preload_delay")]
    pub preload_delay: Duration,

    /// Entries the adjacent-quality preload cache holds.
    ///
    /// Default: 4.
    #[serde(default = "default_preload_capacity")]
    pub preload_capacity: usize,

    /// Brief wait between stopping the engine and releasing its handle, so
    /// the native worker can quiesce.
    ///
    /// Default: 100 milliseconds.
    #[serde(default = "default_quiesce_wait")]
    pub quiesce_wait: Duration,

    /// Attempts for transient resolver failures before surfacing.
    ///
    /// Default: 2.
    #[serde(default = "default_resolve_attempts")]
    pub resolve_attempts: u32,

    /// Command channel capacity of the control loop.
    ///
    /// Default: 64.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            resume_backoff: default_resume_backoff(),
            switch_backoff_threshold: default_switch_backoff_threshold(),
            track_wait: default_track_wait(),
            seek_settle_wait: default_seek_settle_wait(),
            seek_tolerance: default_seek_tolerance(),
            seek_verify_attempts: default_seek_verify_attempts(),
            seek_verify_delay: default_seek_verify_delay(),
            switch_debounce: default_switch_debounce(),
            stall_timeout: default_stall_timeout(),
            progress_throttle: default_progress_throttle(),
            preload_delay: default_preload_delay(),
            preload_capacity: default_preload_capacity(),
            quiesce_wait: default_quiesce_wait(),
            resolve_attempts: default_resolve_attempts(),
            command_capacity: default_command_capacity(),
        }
    }
}

impl PlayerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.seek_verify_attempts == 0 {
            return Err("seek_verify_attempts must be > 0".to_string());
        }

        if self.resolve_attempts == 0 {
            return Err("resolve_attempts must be > 0".to_string());
        }

        if self.preload_capacity == 0 {
            return Err("preload_capacity must be > 0".to_string());
        }

        if self.command_capacity == 0 {
            return Err("command_capacity must be > 0".to_string());
        }

        if self.switch_debounce.is_zero() {
            return Err("switch_debounce must be > 0".to_string());
        }

        if self.stall_timeout <= self.switch_debounce {
            return Err("stall_timeout must exceed switch_debounce".to_string());
        }

        if self.seek_tolerance.is_zero() {
            return Err("seek_tolerance must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_resume_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_switch_backoff_threshold() -> Duration {
    Duration::from_secs(2)
}

fn default_track_wait() -> Duration {
    Duration::from_secs(5)
}

fn default_seek_settle_wait() -> Duration {
    Duration::from_secs(8)
}

fn default_seek_tolerance() -> Duration {
    Duration::from_secs(3)
}

fn default_seek_verify_attempts() -> u32 {
    3
}

fn default_seek_verify_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_switch_debounce() -> Duration {
    Duration::from_millis(350)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_progress_throttle() -> Duration {
    Duration::from_millis(500)
}

fn default_preload_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_preload_capacity() -> usize {
    4
}

fn default_quiesce_wait() -> Duration {
    Duration::from_millis(100)
}

fn default_resolve_attempts() -> u32 {
    2
}

fn default_command_capacity() -> usize {
    64
}
