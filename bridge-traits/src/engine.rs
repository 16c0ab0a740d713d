//! Native engine bridge traits and supporting media types.
//!
//! These abstractions let the playback control core drive a platform-specific
//! decode/render engine while staying agnostic of the concrete backend. Host
//! applications provide an adapter for their engine (libmpv, ExoPlayer,
//! AVPlayer, a texture-backed FFI player, ...); the core only ever sees the
//! traits below.
//!
//! ## Contract
//!
//! The engine runs on its own worker thread(s). Control calls
//! ([`EngineHandle::play`], [`pause`](EngineHandle::pause),
//! [`seek`](EngineHandle::seek), ...) must return promptly; completion is
//! observed through the event stream, not through the call itself. One open
//! call produces one handle; the handle is exclusively owned by a single
//! playback session and must not be used after [`EngineHandle::dispose`].

use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// A media location the engine can open directly.
///
/// Playlist text returned by the resolver is materialized to a local file by
/// the core before it reaches the engine, so adapters only deal with URLs and
/// file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSource {
    /// Remote HTTP(S) stream or playlist URL.
    RemoteUrl(String),
    /// Local file, typically a materialized playlist.
    LocalFile(PathBuf),
}

impl EngineSource {
    /// Location string suitable for handing to a native open call.
    pub fn location(&self) -> String {
        match self {
            EngineSource::RemoteUrl(url) => url.clone(),
            EngineSource::LocalFile(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Options supplied alongside an open request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOptions {
    /// Open without starting playback. The core always opens paused and
    /// releases playback only once the start position is confirmed.
    pub start_paused: bool,
    /// Prefer hardware decoding when the platform supports it.
    pub hardware_decode: bool,
    /// Initial playback rate.
    pub rate: f32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            start_paused: false,
            hardware_decode: true,
            rate: 1.0,
        }
    }
}

/// Description of the selected video track, reported once the engine has
/// probed the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTrack {
    pub width: u32,
    pub height: u32,
    /// Frames per second, when the demuxer reports it.
    pub frame_rate: Option<f32>,
}

impl VideoTrack {
    /// A track is considered valid once it has non-zero dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Asynchronous notifications emitted by the engine worker.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Steady-state playback position report.
    Position(Duration),
    /// Total stream duration became known.
    DurationKnown(Duration),
    /// The engine entered (`true`) or left (`false`) a buffering wait.
    Buffering(bool),
    /// Playback started (`true`) or paused (`false`).
    Playing(bool),
    /// End of stream reached.
    Completed,
    /// A video track was selected and probed.
    TrackReady(VideoTrack),
}

/// Stream of engine events.
///
/// Returns `None` once the handle is disposed and the worker has shut down.
#[async_trait::async_trait]
pub trait EngineEventStream: Send {
    async fn next(&mut self) -> Option<EngineEvent>;
}

/// Live handle to one opened media stream.
#[async_trait::async_trait]
pub trait EngineHandle: Send + Sync {
    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without releasing the stream.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position. Completion shows up as position events
    /// near the target; callers verify rather than trust the call.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Change the playback rate.
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Current playback position as the engine reports it right now.
    async fn position(&self) -> Result<Duration>;

    /// Subscribe to the event stream. Multiple concurrent subscriptions are
    /// allowed; each sees events emitted after it was created.
    async fn subscribe(&self) -> Box<dyn EngineEventStream>;

    /// Stop the worker and release native resources. Idempotent; no events
    /// are emitted after this returns.
    async fn dispose(&self) -> Result<()>;
}

/// Factory for engine handles.
#[async_trait::async_trait]
pub trait NativeEngineAdapter: Send + Sync {
    /// Open a media source and return its handle.
    async fn open(&self, source: EngineSource, options: OpenOptions) -> Result<Box<dyn EngineHandle>>;
}
