//! # Stall Monitoring
//!
//! Tracks buffering reports and decides when buffering has become a stall
//! worth recovering from. The monitor itself is pure bookkeeping; the
//! controller owns the actual timer task and the recovery execution.
//!
//! State flow: Normal → Buffering → {Normal | Recovering} → Normal. Each
//! arm/disarm bumps a stall epoch, so a timer that fires after its window
//! was disarmed identifies itself as stale and is dropped.

use std::time::Duration;

/// Observable stall phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StallState {
    #[default]
    Normal,
    Buffering,
    Recovering,
}

/// Decision returned for a buffering transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallAction {
    /// Nothing to do.
    None,
    /// Arm a single-shot recovery timer carrying this epoch.
    Arm { epoch: u64, timeout: Duration },
    /// Disarm: buffering cleared before the timer fired.
    Disarm,
}

/// Buffering/stall bookkeeping for one controller.
#[derive(Debug)]
pub struct StallMonitor {
    state: StallState,
    epoch: u64,
    timeout: Duration,
}

impl StallMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: StallState::Normal,
            epoch: 0,
            timeout,
        }
    }

    pub fn state(&self) -> StallState {
        self.state
    }

    /// Feed a buffering transition.
    ///
    /// `transitional` suppresses arming while the session is still
    /// initializing, switching, or already recovering. Reopening a stream
    /// always buffers, and recovering from recovery is how storms start.
    pub fn on_buffering(&mut self, buffering: bool, transitional: bool) -> StallAction {
        match (buffering, self.state) {
            (true, StallState::Normal) => {
                if transitional {
                    return StallAction::None;
                }
                self.state = StallState::Buffering;
                self.epoch += 1;
                StallAction::Arm {
                    epoch: self.epoch,
                    timeout: self.timeout,
                }
            }
            (false, StallState::Buffering) => {
                self.state = StallState::Normal;
                self.epoch += 1;
                StallAction::Disarm
            }
            // Repeated reports in the same phase, and anything that arrives
            // while recovering, change nothing.
            _ => StallAction::None,
        }
    }

    /// A recovery timer fired. Returns `true` when it is current and the
    /// player is still buffering: exactly one recovery per armed window.
    pub fn should_recover(&mut self, fired_epoch: u64, transitional: bool) -> bool {
        if fired_epoch != self.epoch || self.state != StallState::Buffering || transitional {
            return false;
        }
        self.state = StallState::Recovering;
        true
    }

    /// Recovery finished (either way); back to normal monitoring.
    pub fn recovery_finished(&mut self) {
        self.state = StallState::Normal;
        self.epoch += 1;
    }

    /// Session reset: drop any armed window.
    pub fn reset(&mut self) {
        self.state = StallState::Normal;
        self.epoch += 1;
    }
}
