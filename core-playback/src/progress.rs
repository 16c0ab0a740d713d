//! # Progress Tracking
//!
//! Owns the authoritative intended position and decides, for every raw
//! engine position event, what it may touch: the UI live stream, the
//! intended position, the throttled persistence report, or nothing at all.
//!
//! The rules exist because engines report garbage at the edges: a burst of
//! zeros right after open, stale positions while a seek is in flight, and a
//! 0-position blip mid quality-switch that would visibly snap the scrub bar
//! to the start if let through.

use crate::retry::within_tolerance;
use std::time::Duration;

/// What a raw position event is allowed to affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDisposition {
    /// Drop entirely (startup/switch artifact).
    Ignore,
    /// Update only the UI-facing live position stream.
    UiOnly(Duration),
    /// Accept into the intended position; `report` marks that the throttled
    /// persistence callback is due.
    Accept { position: Duration, report: bool },
}

/// Position bookkeeping for one controller.
#[derive(Debug)]
pub struct ProgressTracker {
    intended: Duration,
    started: bool,
    seeking: bool,
    switching: bool,
    last_reported: Option<Duration>,
    throttle: Duration,
    seek_tolerance: Duration,
}

impl ProgressTracker {
    pub fn new(throttle: Duration, seek_tolerance: Duration) -> Self {
        Self {
            intended: Duration::ZERO,
            started: false,
            seeking: false,
            switching: false,
            last_reported: None,
            throttle,
            seek_tolerance,
        }
    }

    /// The single authoritative playback position.
    pub fn intended(&self) -> Duration {
        self.intended
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    pub fn is_switching(&self) -> bool {
        self.switching
    }

    /// Playback has produced its first real position since the last
    /// (re)start.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// A seek was issued: the target becomes the intended position
    /// immediately, and steady-state acceptance is suspended until the
    /// engine settles near it.
    pub fn begin_seek(&mut self, target: Duration) {
        self.intended = target;
        self.seeking = true;
    }

    /// Fallback for a seek whose settling was never observed; steady-state
    /// acceptance resumes.
    pub fn settle_seek(&mut self) {
        self.seeking = false;
    }

    /// A quality switch started; 0-position artifacts are suppressed until
    /// [`Self::restart_at`].
    pub fn begin_switch(&mut self) {
        self.switching = true;
    }

    /// A switch failed and the old stream stays; lift the suppression.
    pub fn cancel_switch(&mut self) {
        self.switching = false;
    }

    /// A (re)start landed at `position`: fresh session, completed switch, or
    /// loop restart. This is the only path that may move the intended
    /// position backwards.
    pub fn restart_at(&mut self, position: Duration) {
        self.intended = position;
        self.started = false;
        self.seeking = false;
        self.switching = false;
        self.last_reported = None;
    }

    /// Classify a raw engine position event.
    pub fn on_position(&mut self, position: Duration) -> PositionDisposition {
        if position.is_zero() {
            if self.switching || self.started {
                // Mid-switch blip or steady-state artifact; either way the
                // scrub bar must not snap to zero.
                return PositionDisposition::Ignore;
            }
            return PositionDisposition::UiOnly(position);
        }

        if self.switching {
            return PositionDisposition::UiOnly(position);
        }

        let mut seek_settled = false;
        if self.seeking {
            if within_tolerance(position, self.intended, self.seek_tolerance) {
                self.seeking = false;
                seek_settled = true;
            } else {
                return PositionDisposition::UiOnly(position);
            }
        }

        if !self.started {
            self.started = true;
        } else if !seek_settled && position < self.intended {
            // Backwards jitter during linear playback never lowers the
            // intended position.
            return PositionDisposition::UiOnly(position);
        }

        self.intended = position;
        let report = self
            .last_reported
            .map_or(true, |last| diff(position, last) >= self.throttle);
        if report {
            self.last_reported = Some(position);
        }

        PositionDisposition::Accept { position, report }
    }
}

fn diff(a: Duration, b: Duration) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}
