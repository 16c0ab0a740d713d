//! # Quality Switch Sequencing
//!
//! Debounce bookkeeping for quality changes. Every request bumps a switch
//! epoch and re-captures the rest position; when the quiet period elapses,
//! only the timer carrying the latest epoch is allowed to execute, so rapid
//! repeated requests collapse into exactly one switch targeting the last
//! request's capture.
//!
//! State flow: Idle → Debouncing → Switching → Idle (failures also return to
//! Idle, with the previous session untouched).

use crate::quality::QualityLevel;
use std::time::Duration;

/// Captured context a switch executes with.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSwitch {
    pub target: QualityLevel,
    /// Rest position captured when the winning request was issued.
    pub position: Duration,
    /// Whether playback was running when the first request of the burst
    /// arrived (the burst itself pauses playback).
    pub was_playing: bool,
}

/// Outcome of a switch request.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchRequest {
    /// Target equals the current quality; nothing to do.
    AlreadyCurrent,
    /// Schedule (or reschedule) the debounce timer with this epoch. `first`
    /// is set when this request opened the burst.
    Debounce { epoch: u64, first: bool },
}

/// Switch phase, as observed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Debouncing,
    Switching,
}

/// Debounce and sequencing state for quality changes.
#[derive(Debug, Default)]
pub struct QualitySwitcher {
    phase: Phase,
    epoch: u64,
    pending: Option<PendingSwitch>,
}

impl QualitySwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a switch is being debounced or executed.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Register a request. `position` is the intended position at request
    /// time; `playing` the live play state.
    pub fn request(
        &mut self,
        current_id: &str,
        target: QualityLevel,
        position: Duration,
        playing: bool,
    ) -> SwitchRequest {
        if target.id() == current_id && self.phase == Phase::Idle {
            return SwitchRequest::AlreadyCurrent;
        }

        let first = self.phase == Phase::Idle;
        self.epoch += 1;

        let was_playing = match &self.pending {
            // Later requests in a burst keep the original play state; the
            // first request already paused the stream.
            Some(previous) if !first => previous.was_playing,
            _ => playing,
        };

        self.pending = Some(PendingSwitch {
            target,
            position,
            was_playing,
        });
        self.phase = Phase::Debouncing;

        SwitchRequest::Debounce {
            epoch: self.epoch,
            first,
        }
    }

    /// The debounce timer with `epoch` fired. Returns the capture to execute
    /// when it is the winning timer, `None` when a later request superseded
    /// it.
    pub fn take_due(&mut self, epoch: u64) -> Option<PendingSwitch> {
        if epoch != self.epoch || self.phase != Phase::Debouncing {
            return None;
        }
        self.phase = Phase::Switching;
        self.pending.take()
    }

    /// The executing switch finished (success or failure).
    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
        self.pending = None;
    }

    /// Session reset: forget any pending or executing switch.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Idle;
        self.pending = None;
    }
}
