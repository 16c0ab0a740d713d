//! # Background Audio Coordination
//!
//! Reconciles playback with the OS signals that arrive from outside the
//! session: phone-call audio interruptions, app backgrounding, and
//! connectivity changes. The OS exposes exactly one media notification
//! surface per process, so this is a process-wide singleton with explicit
//! init-once semantics and `attach`/`detach`, not a nullable static.
//!
//! The coordinator never mutates player state itself; it drives the attached
//! controller through its reduced [`ControlHandle`] surface, keeping the
//! single-owner concurrency model intact.

use crate::controller::{ControlHandle, PlayerState};
use crate::error::{PlayerError, Result};
use crate::prefs::PlayerPreferences;
use crate::session::SubscriptionGroup;
use bridge_traits::{
    AudioInterruption, AudioInterruptionObserver, LifecycleObserver, LifecycleState,
    NetworkMonitor, NetworkStatus,
};
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

static INSTANCE: OnceLock<BackgroundAudioCoordinator> = OnceLock::new();

/// Process-wide coordinator between OS signals and the active controller.
pub struct BackgroundAudioCoordinator {
    lifecycle: Option<Arc<dyn LifecycleObserver>>,
    interruption: Option<Arc<dyn AudioInterruptionObserver>>,
    network: Option<Arc<dyn NetworkMonitor>>,
    prefs: PlayerPreferences,
    // Watcher tasks of the currently attached controller.
    attached: Mutex<Option<SubscriptionGroup>>,
}

impl BackgroundAudioCoordinator {
    /// Build a coordinator from the bridge wiring. Prefer
    /// [`Self::init_global`] in application code; this constructor exists for
    /// hosts embedding several independent players and for tests.
    pub fn new(deps: &CoreConfig) -> Self {
        Self {
            lifecycle: deps.lifecycle_observer.clone(),
            interruption: deps.interruption_observer.clone(),
            network: deps.network_monitor.clone(),
            prefs: PlayerPreferences::new(deps.settings_store.clone()),
            attached: Mutex::new(None),
        }
    }

    /// Initialize the process-wide instance. Errors on a second call.
    pub fn init_global(deps: &CoreConfig) -> Result<&'static Self> {
        if INSTANCE.set(Self::new(deps)).is_err() {
            return Err(PlayerError::Internal(
                "background coordinator already initialized".to_string(),
            ));
        }
        INSTANCE.get().ok_or_else(|| {
            PlayerError::Internal("background coordinator unavailable".to_string())
        })
    }

    /// The process-wide instance, when initialized.
    pub fn global() -> Option<&'static Self> {
        INSTANCE.get()
    }

    /// Whether a controller is currently attached.
    pub fn is_attached(&self) -> bool {
        self.attached.lock().is_some()
    }

    /// Attach a controller: its playback follows OS signals until `detach`.
    /// Attaching replaces any previously attached controller.
    pub async fn attach(&self, control: ControlHandle, state: watch::Receiver<PlayerState>) {
        let mut group = SubscriptionGroup::new();

        if let Some(observer) = &self.interruption {
            match observer.subscribe_changes().await {
                Ok(mut stream) => {
                    let control = control.clone();
                    let state = state.clone();
                    group.spawn(async move {
                        // Pause on interruption, resume only what we paused.
                        let mut paused_by_us = false;
                        while let Some(event) = stream.next().await {
                            match event {
                                AudioInterruption::Began => {
                                    if state.borrow().playing {
                                        debug!("audio interruption began, pausing");
                                        paused_by_us = control.pause().await.is_ok();
                                    }
                                }
                                AudioInterruption::Ended { should_resume } => {
                                    if paused_by_us && should_resume {
                                        debug!("audio interruption ended, resuming");
                                        control.play().await.ok();
                                    }
                                    paused_by_us = false;
                                }
                            }
                        }
                    });
                }
                Err(err) => warn!(error = %err, "interruption stream unavailable"),
            }
        }

        if let Some(observer) = &self.lifecycle {
            match observer.subscribe_changes().await {
                Ok(mut stream) => {
                    let control = control.clone();
                    let state = state.clone();
                    let prefs = self.prefs.clone();
                    group.spawn(async move {
                        let mut paused_by_background = false;
                        while let Some(transition) = stream.next().await {
                            match transition {
                                LifecycleState::Background => {
                                    if state.borrow().playing && !prefs.background_play().await {
                                        debug!("app backgrounded, pausing");
                                        paused_by_background = control.pause().await.is_ok();
                                    }
                                }
                                LifecycleState::Foreground => {
                                    if paused_by_background {
                                        debug!("app foregrounded, resuming");
                                        control.play().await.ok();
                                    }
                                    paused_by_background = false;
                                }
                            }
                        }
                    });
                }
                Err(err) => warn!(error = %err, "lifecycle stream unavailable"),
            }
        }

        if let Some(monitor) = &self.network {
            match monitor.subscribe_changes().await {
                Ok(mut stream) => {
                    let control = control.clone();
                    group.spawn(async move {
                        let mut previous = NetworkStatus::Indeterminate;
                        while let Some(status) = stream.next().await {
                            if status == NetworkStatus::Connected
                                && previous == NetworkStatus::Disconnected
                            {
                                info!("connectivity restored");
                                control.connectivity_restored().await.ok();
                            }
                            previous = status;
                        }
                    });
                }
                Err(err) => warn!(error = %err, "network stream unavailable"),
            }
        }

        // Replacing the group releases the previous controller's watchers.
        *self.attached.lock() = Some(group);
    }

    /// Detach the current controller; its playback no longer follows OS
    /// signals. Idempotent.
    pub async fn detach(&self) {
        if let Some(mut group) = self.attached.lock().take() {
            group.release();
        }
    }
}
