//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback control core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Media
//! - [`NativeEngineAdapter`](engine::NativeEngineAdapter) - Opens media on the
//!   native decode/render engine
//! - [`EngineHandle`](engine::EngineHandle) - Control surface and event stream
//!   of one opened stream
//! - [`MediaResourceResolver`](resolver::MediaResourceResolver) - Resolves
//!   (resource, quality) into a playable URL or playlist text
//!
//! ### Persistence
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`ProgressSink`](storage::ProgressSink) - Best-effort watch-progress
//!   reporting
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity detection
//! - [`LifecycleObserver`](background::LifecycleObserver) - App
//!   foreground/background transitions
//! - [`AudioInterruptionObserver`](background::AudioInterruptionObserver) -
//!   Phone-call / audio-focus interruptions
//! - [`WakeLock`](background::WakeLock) - Keeps the display on during playback
//! - [`MediaSessionSurface`](background::MediaSessionSurface) - The one
//!   OS media notification surface per process
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages with context.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod background;
pub mod engine;
pub mod error;
pub mod network;
pub mod resolver;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{
    AudioInterruption, AudioInterruptionObserver, AudioInterruptionStream, LifecycleChangeStream,
    LifecycleObserver, LifecycleState, MediaMetadata, MediaSessionSurface, WakeLock,
};
pub use engine::{
    EngineEvent, EngineEventStream, EngineHandle, EngineSource, NativeEngineAdapter, OpenOptions,
    VideoTrack,
};
pub use network::{NetworkChangeStream, NetworkMonitor, NetworkStatus};
pub use resolver::{MediaResourceResolver, MediaSource, QualityInfo, ResourceId};
pub use storage::{ProgressSink, SettingsStore};
