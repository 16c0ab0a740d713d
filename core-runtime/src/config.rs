//! # Core Configuration Module
//!
//! Dependency wiring for the playback core.
//!
//! ## Overview
//!
//! `CoreConfig` holds every bridge implementation the core needs, constructed
//! through a builder with fail-fast validation: required capabilities missing
//! at `build()` time produce an actionable [`Error::CapabilityMissing`]
//! instead of a panic deep inside playback.
//!
//! ## Required Dependencies
//!
//! - `NativeEngineAdapter` - the decode/render engine facade
//! - `MediaResourceResolver` - (resource, quality) → playable source
//! - `SettingsStore` - persisted player preferences
//!
//! ## Optional Dependencies
//!
//! - `ProgressSink` - watch-progress persistence (skipped when absent)
//! - `NetworkMonitor` - connectivity-driven stall recovery
//! - `LifecycleObserver` / `AudioInterruptionObserver` - OS signal sources
//!   for the background coordinator
//! - `WakeLock` - display keep-alive during playback
//! - `MediaSessionSurface` - the OS media notification surface
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .engine(Arc::new(MyEngineAdapter::new()))
//!     .resolver(Arc::new(MyResolver::new(api)))
//!     .settings_store(Arc::new(MySettings::new()))
//!     .wake_lock(Arc::new(MyWakeLock))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioInterruptionObserver, LifecycleObserver, MediaResourceResolver, MediaSessionSurface,
    NativeEngineAdapter, NetworkMonitor, ProgressSink, SettingsStore, WakeLock,
};
use std::sync::Arc;

/// Bridge wiring for the playback core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native decode/render engine adapter (required)
    pub engine: Arc<dyn NativeEngineAdapter>,

    /// Media resource resolver (required)
    pub resolver: Arc<dyn MediaResourceResolver>,

    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Watch-progress persistence sink (optional)
    pub progress_sink: Option<Arc<dyn ProgressSink>>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Audio interruption observer (optional)
    pub interruption_observer: Option<Arc<dyn AudioInterruptionObserver>>,

    /// Display wakelock (optional)
    pub wake_lock: Option<Arc<dyn WakeLock>>,

    /// OS media-session surface (optional)
    pub media_session: Option<Arc<dyn MediaSessionSurface>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("engine", &"NativeEngineAdapter { ... }")
            .field("resolver", &"MediaResourceResolver { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "progress_sink",
                &self.progress_sink.as_ref().map(|_| "ProgressSink { ... }"),
            )
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field(
                "interruption_observer",
                &self
                    .interruption_observer
                    .as_ref()
                    .map(|_| "AudioInterruptionObserver { ... }"),
            )
            .field("wake_lock", &self.wake_lock.as_ref().map(|_| "WakeLock"))
            .field(
                "media_session",
                &self.media_session.as_ref().map(|_| "MediaSessionSurface"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    engine: Option<Arc<dyn NativeEngineAdapter>>,
    resolver: Option<Arc<dyn MediaResourceResolver>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    interruption_observer: Option<Arc<dyn AudioInterruptionObserver>>,
    wake_lock: Option<Arc<dyn WakeLock>>,
    media_session: Option<Arc<dyn MediaSessionSurface>>,
}

impl CoreConfigBuilder {
    /// Sets the native engine adapter (required).
    pub fn engine(mut self, engine: Arc<dyn NativeEngineAdapter>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the media resource resolver (required).
    pub fn resolver(mut self, resolver: Arc<dyn MediaResourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the settings store implementation (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the progress persistence sink (optional).
    ///
    /// When absent, progress reports are simply not persisted.
    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Sets the network monitor implementation (optional).
    ///
    /// Enables connectivity-restored stall recovery.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the audio interruption observer implementation (optional).
    pub fn interruption_observer(mut self, observer: Arc<dyn AudioInterruptionObserver>) -> Self {
        self.interruption_observer = Some(observer);
        self
    }

    /// Sets the wakelock implementation (optional).
    pub fn wake_lock(mut self, wake_lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = Some(wake_lock);
        self
    }

    /// Sets the media-session surface implementation (optional).
    pub fn media_session(mut self, surface: Arc<dyn MediaSessionSurface>) -> Self {
        self.media_session = Some(surface);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a required bridge is absent.
    pub fn build(self) -> Result<CoreConfig> {
        let engine = self.engine.ok_or_else(|| {
            capability_missing(
                "NativeEngineAdapter",
                "No native engine implementation provided. \
                 Inject the platform's decode/render engine adapter via .engine().",
            )
        })?;

        let resolver = self.resolver.ok_or_else(|| {
            capability_missing(
                "MediaResourceResolver",
                "No media resolver provided. \
                 Inject the network layer's resolver via .resolver().",
            )
        })?;

        let settings_store = self.settings_store.ok_or_else(|| {
            capability_missing(
                "SettingsStore",
                "No settings store provided. \
                 Inject a key-value preferences store via .settings_store().",
            )
        })?;

        Ok(CoreConfig {
            engine,
            resolver,
            settings_store,
            progress_sink: self.progress_sink,
            network_monitor: self.network_monitor,
            lifecycle_observer: self.lifecycle_observer,
            interruption_observer: self.interruption_observer,
            wake_lock: self.wake_lock,
            media_session: self.media_session,
        })
    }
}
