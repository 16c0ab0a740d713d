//! # Session State & Resources
//!
//! The per-session state machine (one source of truth instead of a pile of
//! re-entrancy booleans), the subscription group that tears down every
//! session task atomically, and the bundle of resources a live session owns.

use crate::error::{PlayerError, Result};
use crate::quality::QualityLevel;
use crate::source::LoadedSource;
use bridge_traits::{EngineHandle, ResourceId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Session State Machine
// ============================================================================

/// Session lifecycle phase. All transitions go through
/// [`SessionState::transition`], which rejects anything not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    /// No session. The only state a new controller starts in and dispose
    /// ends in.
    #[default]
    Idle,
    /// initialize() is resolving, opening, and verifying the start position.
    Initializing,
    /// A live session is playing or paused.
    Ready,
    /// A debounced quality switch is pending or executing.
    Switching,
    /// A stall recovery is reopening the stream.
    Recovering,
    /// dispose() is tearing the session down.
    Disposing,
}

impl SessionState {
    /// States in which event-driven recovery and preloading must hold off.
    pub fn is_transitional(self) -> bool {
        !matches!(self, SessionState::Ready)
    }

    fn allows(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Initializing)
                | (Initializing, Ready)
                | (Initializing, Idle)
                | (Initializing, Initializing)
                | (Ready, Initializing)
                | (Ready, Switching)
                | (Ready, Recovering)
                | (Switching, Ready)
                | (Switching, Initializing)
                | (Recovering, Ready)
                | (Recovering, Initializing)
                | (_, Disposing)
                | (Disposing, Idle)
        )
    }

    /// Validated transition; an invalid pair is an internal error.
    pub fn transition(&mut self, to: SessionState) -> Result<()> {
        if !self.allows(to) {
            return Err(PlayerError::Internal(format!(
                "invalid session transition {:?} -> {:?}",
                self, to
            )));
        }
        *self = to;
        Ok(())
    }
}

// ============================================================================
// Subscription Group
// ============================================================================

/// Event pumps and timers attached to one session, released as a unit.
///
/// `release()` cancels the shared token and aborts every task, so "no more
/// callbacks after teardown begins" holds by construction rather than by the
/// order of individual cancellations.
#[derive(Debug, Default)]
pub struct SubscriptionGroup {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task tied to this group. The future is dropped at the first
    /// await point once the group is released.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        self.tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = future => {}
            }
        }));
    }

    /// Cancel and abort everything in the group. Idempotent.
    pub fn release(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for SubscriptionGroup {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Playback Session
// ============================================================================

/// Everything a live session exclusively owns. Built by initialize (or a
/// completed switch/recovery), consumed by teardown.
pub(crate) struct PlaybackSession {
    pub resource: ResourceId,
    pub quality: QualityLevel,
    pub qualities: Vec<QualityLevel>,
    pub handle: Arc<dyn EngineHandle>,
    /// Keeps any materialized playlist file alive until teardown.
    pub loaded: LoadedSource,
    pub duration: Option<Duration>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("resource", &self.resource)
            .field("quality", &self.quality.id())
            .field("duration", &self.duration)
            .finish()
    }
}
