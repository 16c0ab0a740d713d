//! App Lifecycle, Audio Focus, and OS Media Integration
//!
//! Traits through which the host forwards the OS signals that affect
//! playback: foreground/background transitions, audio interruptions (phone
//! calls, assistant sessions), the screen wakelock, and the process-wide
//! media-session notification surface.

use crate::error::Result;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
}

/// Lifecycle observer trait
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: Window focus/minimize events (less critical)
#[async_trait::async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle state changes
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle state changes
#[async_trait::async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next lifecycle state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}

/// Audio interruption phase.
///
/// `Began` covers anything that takes the audio route away from the app: an
/// incoming call, an assistant session, another app claiming exclusive focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioInterruption {
    Began,
    /// The interruption ended; `should_resume` carries the OS hint about
    /// whether resuming playback is appropriate.
    Ended { should_resume: bool },
}

/// Audio interruption observer trait
///
/// - **iOS**: AVAudioSession interruption notifications
/// - **Android**: AudioFocus change callbacks + telephony state
#[async_trait::async_trait]
pub trait AudioInterruptionObserver: Send + Sync {
    /// Subscribe to interruption notifications
    async fn subscribe_changes(&self) -> Result<Box<dyn AudioInterruptionStream>>;
}

/// Stream of audio interruption notifications
#[async_trait::async_trait]
pub trait AudioInterruptionStream: Send {
    /// Get the next interruption notification
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<AudioInterruption>;
}

/// Screen/system wakelock.
///
/// Held while a session is live so the display does not sleep mid-playback.
/// Acquire and release are idempotent; the host tracks the underlying OS
/// execution-state flags.
#[async_trait::async_trait]
pub trait WakeLock: Send + Sync {
    async fn acquire(&self) -> Result<()>;

    async fn release(&self) -> Result<()>;
}

/// Metadata shown on the OS media-session surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Opaque identifier of the playing resource, for host-side routing.
    pub resource_id: Option<String>,
}

/// The process-wide media-session / background-audio notification surface.
///
/// The OS exposes exactly one of these per app, which is why the core wraps
/// it in a singleton coordinator with init-once semantics rather than letting
/// every session talk to it directly.
#[async_trait::async_trait]
pub trait MediaSessionSurface: Send + Sync {
    /// Show or update the surface with current metadata.
    async fn activate(&self, metadata: MediaMetadata) -> Result<()>;

    /// Reflect the play/pause state on the surface controls.
    async fn set_playing(&self, playing: bool) -> Result<()>;

    /// Tear the surface down.
    async fn deactivate(&self) -> Result<()>;
}
