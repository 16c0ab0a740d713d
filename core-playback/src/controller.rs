//! # Player Controller
//!
//! The session lifecycle coordinator. A [`PlayerController`] is a cheap
//! handle; the real work happens in a control-loop task that owns every piece
//! of mutable state. UI commands, native engine events, timer expiries, and
//! spawned-operation completions all funnel into one command channel, so all
//! state mutation is single-threaded by construction; there is no locking
//! anywhere in this module.
//!
//! ## Cancellation model
//!
//! Long-running operations (initialize, quality switch, stall recovery) run
//! as spawned tasks that post their completion back into the channel tagged
//! with the epoch they were started under. The loop bumps the epoch whenever
//! a session is superseded; a completion whose epoch no longer matches
//! disposes its own resources and is dropped without touching shared state.
//! Nothing is ever force-aborted mid-open.

use crate::cache::PreloadCache;
use crate::config::PlayerConfig;
use crate::error::{ClassifiedError, PlayerError, Result};
use crate::prefs::{DecodeMode, PlayerPreferences};
use crate::progress::{PositionDisposition, ProgressTracker};
use crate::quality::{self, QualityLevel};
use crate::retry::{retry_with, verify_seek, RetryPolicy};
use crate::session::{PlaybackSession, SessionState, SubscriptionGroup};
use crate::source::LoadedSource;
use crate::stall::{StallAction, StallMonitor};
use crate::switcher::{PendingSwitch, QualitySwitcher, SwitchRequest};
use bridge_traits::{
    EngineEvent, EngineHandle, MediaMetadata, MediaSource, OpenOptions, ResourceId,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SessionEvent};
use core_runtime::CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Public Types
// ============================================================================

/// Why a seek was issued; drives logging and restart semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekReason {
    User,
    Resume,
    Loop,
    QualitySwitch,
}

/// Observable snapshot of the player, published through a watch channel on
/// every meaningful change.
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub session: SessionState,
    pub loading: bool,
    pub initialized: bool,
    pub switching_quality: bool,
    pub buffering: bool,
    pub playing: bool,
    pub loop_mode: bool,
    pub error: Option<ClassifiedError>,
    pub current_quality: Option<QualityLevel>,
    pub available_qualities: Vec<QualityLevel>,
    pub duration: Option<Duration>,
}

// ============================================================================
// Commands
// ============================================================================

pub(crate) enum Command {
    // UI surface
    Initialize {
        resource: ResourceId,
        resume: Option<Duration>,
    },
    Play,
    Pause,
    Seek {
        position: Duration,
        reason: SeekReason,
    },
    ChangeQuality {
        quality_id: String,
    },
    SetLoopMode(bool),
    SetRate(f32),
    ConnectivityRestored,
    Dispose {
        ack: oneshot::Sender<()>,
    },

    // Funneled asynchronous continuations
    Engine {
        epoch: u64,
        event: EngineEvent,
    },
    OpenDone {
        epoch: u64,
        kind: OpenKind,
        outcome: Result<OpenedStream>,
    },
    ExecuteSwitch {
        switch_epoch: u64,
    },
    StallFired {
        stall_epoch: u64,
    },
    SeekSettleTimeout {
        seek_seq: u64,
    },
    PreloadTick {
        epoch: u64,
    },
    PreloadFetched {
        epoch: u64,
        quality_id: String,
        source: MediaSource,
    },
}

/// Which operation an open completion belongs to.
pub(crate) enum OpenKind {
    Initialize,
    Switch { ctx: PendingSwitch },
    Recovery { was_playing: bool },
}

/// A fully prepared stream: opened paused, track awaited, start position
/// seeked and verified.
pub(crate) struct OpenedStream {
    session: PlaybackSession,
    start_position: Duration,
}

// ============================================================================
// Controller Handle
// ============================================================================

/// Public handle to the control loop. Clone-cheap; dropping every handle
/// shuts the loop down after a best-effort teardown.
pub struct PlayerController {
    tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<PlayerState>,
    position_rx: watch::Receiver<Duration>,
    events: EventBus,
}

impl PlayerController {
    /// Spawn the control loop with the given tuning and bridge wiring.
    pub fn new(config: PlayerConfig, deps: CoreConfig) -> Result<Self> {
        config.validate().map_err(PlayerError::Internal)?;

        let (tx, rx) = mpsc::channel(config.command_capacity);
        let (state_tx, state_rx) = watch::channel(PlayerState::default());
        let (position_tx, position_rx) = watch::channel(Duration::ZERO);
        let events = EventBus::default();

        let prefs = PlayerPreferences::new(deps.settings_store.clone());
        let inner = PlayerInner {
            progress: ProgressTracker::new(config.progress_throttle, config.seek_tolerance),
            stall: StallMonitor::new(config.stall_timeout),
            switcher: QualitySwitcher::new(),
            preload: PreloadCache::new(config.preload_capacity),
            subs: SubscriptionGroup::new(),
            config,
            deps,
            prefs,
            events: events.clone(),
            cmd_tx: tx.clone(),
            state_tx,
            position_tx,
            epoch: 0,
            state: SessionState::Idle,
            session: None,
            initializing: None,
            playing: false,
            loop_mode: false,
            buffering: false,
            duration: None,
            error: None,
            seek_seq: 0,
        };
        tokio::spawn(inner.run(rx));

        Ok(Self {
            tx,
            state_rx,
            position_rx,
            events,
        })
    }

    /// Load a resource and prepare playback, optionally resuming near a
    /// stored position. Re-entrant calls for the same resource are ignored;
    /// a different resource supersedes the in-flight one.
    pub async fn initialize(&self, resource: ResourceId, resume: Option<Duration>) -> Result<()> {
        self.send(Command::Initialize { resource, resume }).await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.send(Command::Seek {
            position,
            reason: SeekReason::User,
        })
        .await
    }

    /// Request a switch to another quality level. Rapid repeated calls are
    /// debounced; only the last one executes.
    pub async fn change_quality(&self, quality_id: &str) -> Result<()> {
        self.send(Command::ChangeQuality {
            quality_id: quality_id.to_string(),
        })
        .await
    }

    pub async fn set_loop_mode(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetLoopMode(enabled)).await
    }

    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        self.send(Command::SetRate(rate)).await
    }

    /// Tear the session down and wait until teardown has completed. The
    /// controller can be initialized again afterwards.
    pub async fn dispose(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Dispose { ack }).await?;
        done.await
            .map_err(|_| PlayerError::Internal("controller task stopped".to_string()))
    }

    /// Observable state snapshot stream.
    pub fn state(&self) -> watch::Receiver<PlayerState> {
        self.state_rx.clone()
    }

    /// High-frequency UI-only position stream (smooth scrub visuals). Not
    /// authoritative; see the progress events for that.
    pub fn ui_position(&self) -> watch::Receiver<Duration> {
        self.position_rx.clone()
    }

    /// Subscribe to the controller's event bus.
    pub fn subscribe_events(&self) -> core_runtime::events::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Reduced command surface for the background coordinator.
    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PlayerError::Internal("controller task stopped".to_string()))
    }
}

/// Pause/resume/recovery surface handed to the background coordinator.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Command>,
}

impl ControlHandle {
    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn connectivity_restored(&self) -> Result<()> {
        self.send(Command::ConnectivityRestored).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PlayerError::Internal("controller task stopped".to_string()))
    }
}

// ============================================================================
// Control Loop
// ============================================================================

struct PlayerInner {
    config: PlayerConfig,
    deps: CoreConfig,
    prefs: PlayerPreferences,
    events: EventBus,
    cmd_tx: mpsc::Sender<Command>,
    state_tx: watch::Sender<PlayerState>,
    position_tx: watch::Sender<Duration>,

    epoch: u64,
    state: SessionState,
    session: Option<PlaybackSession>,
    subs: SubscriptionGroup,
    progress: ProgressTracker,
    stall: StallMonitor,
    switcher: QualitySwitcher,
    preload: PreloadCache,

    /// Resource an initialize is in flight for.
    initializing: Option<ResourceId>,
    playing: bool,
    loop_mode: bool,
    buffering: bool,
    duration: Option<Duration>,
    error: Option<ClassifiedError>,
    seek_seq: u64,
}

impl PlayerInner {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        loop {
            match rx.recv().await {
                Some(command) => self.handle(command).await,
                None => {
                    // Every handle dropped: tear down whatever is live.
                    if self.session.is_some() {
                        let (ack, _) = oneshot::channel();
                        self.handle_dispose(ack).await;
                    }
                    break;
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Initialize { resource, resume } => {
                self.handle_initialize(resource, resume).await
            }
            Command::Play => self.handle_play().await,
            Command::Pause => self.handle_pause().await,
            Command::Seek { position, reason } => self.handle_seek(position, reason).await,
            Command::ChangeQuality { quality_id } => self.handle_change_quality(quality_id).await,
            Command::SetLoopMode(enabled) => self.handle_set_loop_mode(enabled),
            Command::SetRate(rate) => self.handle_set_rate(rate).await,
            Command::ConnectivityRestored => self.handle_connectivity_restored().await,
            Command::Dispose { ack } => self.handle_dispose(ack).await,
            Command::Engine { epoch, event } => self.handle_engine_event(epoch, event).await,
            Command::OpenDone {
                epoch,
                kind,
                outcome,
            } => self.handle_open_done(epoch, kind, outcome).await,
            Command::ExecuteSwitch { switch_epoch } => self.handle_execute_switch(switch_epoch).await,
            Command::StallFired { stall_epoch } => self.handle_stall_fired(stall_epoch).await,
            Command::SeekSettleTimeout { seek_seq } => self.handle_seek_settle_timeout(seek_seq),
            Command::PreloadTick { epoch } => self.handle_preload_tick(epoch),
            Command::PreloadFetched {
                epoch,
                quality_id,
                source,
            } => self.handle_preload_fetched(epoch, quality_id, source),
        }
    }

    // ------------------------------------------------------------------
    // Initialize
    // ------------------------------------------------------------------

    #[instrument(skip(self), fields(resource = %resource))]
    async fn handle_initialize(&mut self, resource: ResourceId, resume: Option<Duration>) {
        if self.initializing.as_ref() == Some(&resource) {
            debug!("initialize already in flight for this resource, ignoring");
            return;
        }

        // A different resource supersedes: invalidate in-flight continuations
        // and drop any live session.
        self.epoch += 1;
        if self.session.is_some() {
            self.release_session().await;
        }

        self.initializing = Some(resource.clone());
        self.stall.reset();
        self.switcher.reset();
        self.error = None;
        self.loop_mode = self.prefs.loop_mode().await;
        if let Err(err) = self.state.transition(SessionState::Initializing) {
            warn!(error = %err, "state machine rejected initialize");
            return;
        }
        self.publish_state();

        // Resume positions back off from the stored point so the seek does
        // not land exactly on a segment boundary.
        let start_position = resume
            .filter(|r| !r.is_zero())
            .map(|r| r.saturating_sub(self.config.resume_backoff));

        info!(?start_position, "initializing session");
        self.spawn_open(OpenKind::Initialize, resource, None, None, None, start_position);
    }

    // ------------------------------------------------------------------
    // Basic transport controls
    // ------------------------------------------------------------------

    async fn handle_play(&mut self) {
        let Some(handle) = self.session_handle() else {
            return;
        };
        if let Err(err) = handle.play().await {
            warn!(error = %err, "engine play failed");
            return;
        }
        self.playing = true;
        self.publish_state();
    }

    async fn handle_pause(&mut self) {
        let Some(handle) = self.session_handle() else {
            return;
        };
        if let Err(err) = handle.pause().await {
            warn!(error = %err, "engine pause failed");
            return;
        }
        self.playing = false;
        self.publish_state();
    }

    async fn handle_seek(&mut self, position: Duration, reason: SeekReason) {
        let Some(handle) = self.session_handle() else {
            return;
        };
        if self.switcher.is_active() {
            // The pending switch already captured its rest position; a seek
            // racing the debounce window would be overwritten anyway.
            debug!(?position, "seek ignored during quality switch");
            return;
        }

        debug!(?position, ?reason, "seek");
        self.seek_seq += 1;
        self.progress.begin_seek(position);
        self.position_tx.send_replace(position);

        if let Err(err) = handle.seek(position).await {
            warn!(error = %err, "engine seek failed");
        }

        // Fallback: if no position event ever settles near the target, stop
        // treating the seek as in flight after the buffering window.
        let seq = self.seek_seq;
        let wait = self.config.seek_settle_wait;
        let tx = self.cmd_tx.clone();
        self.subs.spawn(async move {
            tokio::time::sleep(wait).await;
            tx.send(Command::SeekSettleTimeout { seek_seq: seq }).await.ok();
        });
    }

    fn handle_seek_settle_timeout(&mut self, seek_seq: u64) {
        if seek_seq == self.seek_seq && self.progress.is_seeking() {
            debug!("seek settle window elapsed, resuming steady-state tracking");
            self.progress.settle_seek();
        }
    }

    fn handle_set_loop_mode(&mut self, enabled: bool) {
        self.loop_mode = enabled;
        let prefs = self.prefs.clone();
        tokio::spawn(async move { prefs.set_loop_mode(enabled).await });
        self.publish_state();
    }

    async fn handle_set_rate(&mut self, rate: f32) {
        let Some(handle) = self.session_handle() else {
            return;
        };
        if let Err(err) = handle.set_rate(rate).await {
            warn!(error = %err, rate, "engine set_rate failed");
        }
    }

    // ------------------------------------------------------------------
    // Quality switching
    // ------------------------------------------------------------------

    async fn handle_change_quality(&mut self, quality_id: String) {
        let Some(session) = &self.session else {
            debug!("quality change with no session, ignoring");
            return;
        };
        let Some(target) = session
            .qualities
            .iter()
            .find(|l| l.id() == quality_id)
            .cloned()
        else {
            warn!(quality = %quality_id, "requested quality not in catalog");
            return;
        };
        let current_id = session.quality.id().to_string();
        let handle = session.handle.clone();

        match self.switcher.request(
            &current_id,
            target,
            self.progress.intended(),
            self.playing,
        ) {
            SwitchRequest::AlreadyCurrent => {
                debug!(quality = %quality_id, "already at requested quality");
            }
            SwitchRequest::Debounce { epoch, first } => {
                if first {
                    // Pause right away so the old stream cannot glitch while
                    // the new one loads.
                    handle.pause().await.ok();
                    self.playing = false;
                    self.progress.begin_switch();
                    if let Err(err) = self.state.transition(SessionState::Switching) {
                        warn!(error = %err, "state machine rejected switch");
                        self.switcher.reset();
                        self.progress.cancel_switch();
                        return;
                    }
                    self.publish_state();
                }

                let debounce = self.config.switch_debounce;
                let tx = self.cmd_tx.clone();
                self.subs.spawn(async move {
                    tokio::time::sleep(debounce).await;
                    tx.send(Command::ExecuteSwitch {
                        switch_epoch: epoch,
                    })
                    .await
                    .ok();
                });
            }
        }
    }

    async fn handle_execute_switch(&mut self, switch_epoch: u64) {
        let Some(pending) = self.switcher.take_due(switch_epoch) else {
            debug!("debounce timer superseded by a later request");
            return;
        };
        let Some(session) = &self.session else {
            self.switcher.finish();
            return;
        };

        if pending.target.id() == session.quality.id() {
            // The burst ended back where it started; unwind without a reopen.
            let handle = session.handle.clone();
            self.switcher.finish();
            self.progress.cancel_switch();
            let _ = self.state.transition(SessionState::Ready);
            if pending.was_playing {
                handle.play().await.ok();
                self.playing = true;
            }
            self.publish_state();
            return;
        }

        info!(
            from = %session.quality.id(),
            to = %pending.target.id(),
            position = ?pending.position,
            "executing quality switch"
        );

        // Same segment-boundary back-off as resume, once clear of the start.
        let target_position = if pending.position > self.config.switch_backoff_threshold {
            pending.position - self.config.resume_backoff
        } else {
            pending.position
        };

        let cached = self.preload.take(pending.target.id());
        let resource = session.resource.clone();
        let qualities = session.qualities.clone();
        let quality = pending.target.clone();
        self.spawn_open(
            OpenKind::Switch { ctx: pending },
            resource,
            Some(qualities),
            Some(quality),
            cached,
            Some(target_position),
        );
    }

    // ------------------------------------------------------------------
    // Stall detection & recovery
    // ------------------------------------------------------------------

    async fn handle_stall_fired(&mut self, stall_epoch: u64) {
        if !self
            .stall
            .should_recover(stall_epoch, self.state.is_transitional())
        {
            debug!("stale or disarmed stall timer, ignoring");
            return;
        }

        warn!("buffering outlived the stall window, starting recovery");
        self.events.emit(CoreEvent::Playback(PlaybackEvent::Stalled)).ok();
        self.begin_recovery().await;
    }

    async fn handle_connectivity_restored(&mut self) {
        let had_error = self.error.take().is_some();
        self.publish_state();

        let recoverable = self.session.is_some()
            && !self.state.is_transitional()
            && (self.buffering || had_error);
        if !recoverable {
            return;
        }

        info!("connectivity restored, re-triggering recovery");
        self.begin_recovery().await;
    }

    async fn begin_recovery(&mut self) {
        let Some(session) = &self.session else {
            self.stall.recovery_finished();
            return;
        };

        if let Err(err) = self.state.transition(SessionState::Recovering) {
            warn!(error = %err, "state machine rejected recovery");
            self.stall.recovery_finished();
            return;
        }
        self.publish_state();

        let intended = self.progress.intended();
        let target_position = if intended > self.config.switch_backoff_threshold {
            intended - self.config.resume_backoff
        } else {
            intended
        };

        let resource = session.resource.clone();
        let qualities = session.qualities.clone();
        let quality = session.quality.clone();
        self.spawn_open(
            OpenKind::Recovery {
                was_playing: self.playing,
            },
            resource,
            Some(qualities),
            Some(quality),
            None,
            Some(target_position),
        );
    }

    // ------------------------------------------------------------------
    // Open completions
    // ------------------------------------------------------------------

    async fn handle_open_done(&mut self, epoch: u64, kind: OpenKind, outcome: Result<OpenedStream>) {
        if epoch != self.epoch {
            // Superseded while in flight: the completion cleans up after
            // itself and nothing else changes. Expected traffic, not an error.
            debug!("discarding superseded open completion");
            if let Ok(opened) = outcome {
                let handle = opened.session.handle.clone();
                tokio::spawn(async move {
                    handle.dispose().await.ok();
                });
            }
            return;
        }

        match kind {
            OpenKind::Initialize => {
                self.initializing = None;
                match outcome {
                    Ok(opened) => self.install_session(opened, false, Announce::Initialized).await,
                    Err(err) => self.fail_initialize(err),
                }
            }
            OpenKind::Switch { ctx } => match outcome {
                Ok(opened) => {
                    self.switcher.finish();
                    self.install_session(opened, ctx.was_playing, Announce::QualityChanged)
                        .await;
                }
                Err(err) => self.fail_switch(ctx, err).await,
            },
            OpenKind::Recovery { was_playing } => {
                self.stall.recovery_finished();
                match outcome {
                    Ok(opened) => {
                        self.install_session(opened, was_playing, Announce::Recovered).await
                    }
                    Err(err) => self.fail_recovery(err),
                }
            }
        }
    }

    fn fail_initialize(&mut self, err: PlayerError) {
        if err.is_stale() {
            debug!("initialize superseded");
            return;
        }
        warn!(error = %err, "initialize failed");
        self.surface_error(err);
        let _ = self.state.transition(SessionState::Idle);
        self.publish_state();
    }

    async fn fail_switch(&mut self, ctx: PendingSwitch, err: PlayerError) {
        // The previous session is untouched; the user keeps watching the old
        // quality.
        warn!(error = %err, target = %ctx.target.id(), "quality switch failed, keeping previous session");
        self.switcher.finish();
        self.progress.cancel_switch();
        let _ = self.state.transition(SessionState::Ready);
        self.surface_error(err);

        if ctx.was_playing {
            if let Some(handle) = self.session_handle() {
                handle.play().await.ok();
                self.playing = true;
            }
        }
        self.publish_state();
    }

    fn fail_recovery(&mut self, err: PlayerError) {
        warn!(error = %err, "stall recovery failed");
        let _ = self.state.transition(SessionState::Ready);
        self.surface_error(err);
        self.publish_state();
    }

    fn surface_error(&mut self, err: PlayerError) {
        if let Some(classified) = err.classify() {
            self.events
                .emit(CoreEvent::Session(SessionEvent::Error {
                    message: classified.message.clone(),
                    recoverable: classified.recoverable,
                }))
                .ok();
            self.error = Some(classified);
        }
    }

    /// Swap the (possibly absent) old session for a freshly opened one and
    /// wire up its pumps and timers.
    async fn install_session(&mut self, opened: OpenedStream, restore_playing: bool, announce: Announce) {
        self.release_session().await;

        self.epoch += 1;
        let epoch = self.epoch;
        let OpenedStream {
            session,
            start_position,
        } = opened;

        // Event pump: the only path engine events take into the loop.
        let pump_handle = session.handle.clone();
        let pump_tx = self.cmd_tx.clone();
        self.subs.spawn(async move {
            let mut stream = pump_handle.subscribe().await;
            while let Some(event) = stream.next().await {
                if pump_tx
                    .send(Command::Engine { epoch, event })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        self.duration = session.duration;
        self.buffering = false;
        self.stall.reset();
        self.progress.restart_at(start_position);
        self.position_tx.send_replace(start_position);

        let quality_id = session.quality.id().to_string();
        let quality_label = session.quality.label().to_string();
        let resource_str = session.resource.to_string();
        let handle = session.handle.clone();
        self.session = Some(session);
        self.error = None;
        if let Err(err) = self.state.transition(SessionState::Ready) {
            warn!(error = %err, "state machine rejected install");
        }

        if matches!(announce, Announce::Initialized) {
            if let Some(wake_lock) = &self.deps.wake_lock {
                wake_lock.acquire().await.ok();
            }
            if let Some(surface) = &self.deps.media_session {
                surface
                    .activate(MediaMetadata {
                        title: None,
                        subtitle: None,
                        resource_id: Some(resource_str.clone()),
                    })
                    .await
                    .ok();
            }
        }

        let prefs = self.prefs.clone();
        tokio::spawn(async move { prefs.set_last_quality_label(&quality_label).await });

        // Warm the adjacent-quality cache once the session has settled.
        let delay = self.config.preload_delay;
        let tx = self.cmd_tx.clone();
        self.subs.spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send(Command::PreloadTick { epoch }).await.ok();
        });

        if restore_playing {
            handle.play().await.ok();
            self.playing = true;
        } else {
            self.playing = false;
        }

        match announce {
            Announce::Initialized => {
                info!(resource = %resource_str, quality = %quality_id, "session ready");
                self.events
                    .emit(CoreEvent::Session(SessionEvent::Initialized {
                        resource_id: resource_str,
                        quality: quality_id,
                    }))
                    .ok();
            }
            Announce::QualityChanged => {
                info!(quality = %quality_id, "quality switch complete");
                self.events
                    .emit(CoreEvent::Session(SessionEvent::QualityChanged {
                        quality: quality_id,
                    }))
                    .ok();
            }
            Announce::Recovered => {
                info!("stall recovery complete");
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Recovered))
                    .ok();
            }
        }
        self.publish_state();
    }

    /// Release the live session's pumps and hand its engine handle off for
    /// asynchronous disposal. Used when a session is replaced; the full
    /// ordered teardown lives in [`Self::handle_dispose`].
    async fn release_session(&mut self) {
        self.subs.release();
        self.subs = SubscriptionGroup::new();
        if let Some(old) = self.session.take() {
            let handle = old.handle.clone();
            tokio::spawn(async move {
                handle.pause().await.ok();
                handle.dispose().await.ok();
            });
            // Dropping `old.loaded` here deletes any materialized playlist.
        }
    }

    // ------------------------------------------------------------------
    // Dispose
    // ------------------------------------------------------------------

    async fn handle_dispose(&mut self, ack: oneshot::Sender<()>) {
        info!("disposing session");

        // Teardown ordering is the safety-critical contract here:
        // stale-guard every in-flight continuation, then stop timers and
        // event pumps as one atomic group, so no callback runs past this
        // point. Only then may the native engine be touched.
        self.epoch += 1;
        self.switcher.reset();
        self.stall.reset();
        self.subs.release();
        self.subs = SubscriptionGroup::new();
        let _ = self.state.transition(SessionState::Disposing);
        self.publish_state();

        // Passive OS resources before the engine itself.
        if let Some(wake_lock) = &self.deps.wake_lock {
            wake_lock.release().await.ok();
        }
        if let Some(surface) = &self.deps.media_session {
            surface.deactivate().await.ok();
        }

        if let Some(session) = self.session.take() {
            session.handle.pause().await.ok();
            // Give the engine worker a moment to quiesce before the handle
            // goes away.
            tokio::time::sleep(self.config.quiesce_wait).await;
            session.handle.dispose().await.ok();
            // Dropping the session deletes any materialized playlist file.
            drop(session);
        }

        self.preload.clear();
        self.initializing = None;
        self.playing = false;
        self.buffering = false;
        self.duration = None;
        self.error = None;
        self.progress.restart_at(Duration::ZERO);
        self.position_tx.send_replace(Duration::ZERO);
        let _ = self.state.transition(SessionState::Idle);
        self.publish_state();
        self.events
            .emit(CoreEvent::Session(SessionEvent::Disposed))
            .ok();

        ack.send(()).ok();
    }

    // ------------------------------------------------------------------
    // Engine events
    // ------------------------------------------------------------------

    async fn handle_engine_event(&mut self, epoch: u64, event: EngineEvent) {
        if epoch != self.epoch || self.session.is_none() {
            debug!("discarding engine event from a superseded session");
            return;
        }

        match event {
            EngineEvent::Position(position) => self.handle_position(position).await,
            EngineEvent::DurationKnown(duration) => {
                self.duration = Some(duration);
                if let Some(session) = &mut self.session {
                    session.duration = Some(duration);
                }
                self.publish_state();
            }
            EngineEvent::Buffering(buffering) => {
                self.buffering = buffering;
                match self
                    .stall
                    .on_buffering(buffering, self.state.is_transitional())
                {
                    StallAction::Arm { epoch, timeout } => {
                        let tx = self.cmd_tx.clone();
                        self.subs.spawn(async move {
                            tokio::time::sleep(timeout).await;
                            tx.send(Command::StallFired { stall_epoch: epoch }).await.ok();
                        });
                    }
                    StallAction::Disarm | StallAction::None => {}
                }
                self.publish_state();
            }
            EngineEvent::Playing(playing) => {
                self.playing = playing;
                if let Some(surface) = &self.deps.media_session {
                    let surface = surface.clone();
                    tokio::spawn(async move {
                        surface.set_playing(playing).await.ok();
                    });
                }
                self.publish_state();
            }
            EngineEvent::Completed => self.handle_completed().await,
            EngineEvent::TrackReady(track) => {
                debug!(?track, "video track ready");
            }
        }
    }

    async fn handle_position(&mut self, position: Duration) {
        match self.progress.on_position(position) {
            PositionDisposition::Ignore => {}
            PositionDisposition::UiOnly(position) => {
                self.position_tx.send_replace(position);
            }
            PositionDisposition::Accept { position, report } => {
                self.position_tx.send_replace(position);
                if report {
                    self.events
                        .emit(CoreEvent::Playback(PlaybackEvent::ProgressUpdate {
                            position_ms: position.as_millis() as u64,
                            duration_ms: self.duration.map(|d| d.as_millis() as u64),
                        }))
                        .ok();

                    if let (Some(sink), Some(session)) = (&self.deps.progress_sink, &self.session)
                    {
                        let sink = sink.clone();
                        let resource = session.resource.clone();
                        let duration = self.duration;
                        tokio::spawn(async move {
                            // Best-effort; the collaborator retries, we don't.
                            sink.report(&resource, position, duration).await.ok();
                        });
                    }
                }
            }
        }
    }

    async fn handle_completed(&mut self) {
        if self.loop_mode {
            debug!("stream completed, loop mode restarting from zero");
            self.progress.restart_at(Duration::ZERO);
            self.position_tx.send_replace(Duration::ZERO);
            if let Some(handle) = self.session_handle() {
                handle.seek(Duration::ZERO).await.ok();
                handle.play().await.ok();
            }
        } else {
            self.playing = false;
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::VideoEnd))
                .ok();
            self.publish_state();
        }
    }

    // ------------------------------------------------------------------
    // Preload
    // ------------------------------------------------------------------

    fn handle_preload_tick(&mut self, epoch: u64) {
        if epoch != self.epoch || self.state.is_transitional() {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };

        let (up, down) = quality::adjacent(&session.qualities, session.quality.id());
        for level in [up, down].into_iter().flatten() {
            if self.preload.contains(level.id()) {
                continue;
            }
            let resolver = self.deps.resolver.clone();
            let resource = session.resource.clone();
            let quality_id = level.id().to_string();
            let tx = self.cmd_tx.clone();
            self.subs.spawn(async move {
                match resolver.resolve_source(&resource, &quality_id).await {
                    Ok(source) => {
                        tx.send(Command::PreloadFetched {
                            epoch,
                            quality_id,
                            source,
                        })
                        .await
                        .ok();
                    }
                    Err(err) => {
                        // Preloading is opportunistic; a miss costs nothing.
                        debug!(error = %err, quality = %quality_id, "adjacent preload failed");
                    }
                }
            });
        }
    }

    fn handle_preload_fetched(&mut self, epoch: u64, quality_id: String, source: MediaSource) {
        if epoch != self.epoch {
            return;
        }
        self.preload.put(&quality_id, source);
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn session_handle(&self) -> Option<Arc<dyn EngineHandle>> {
        self.session.as_ref().map(|s| s.handle.clone())
    }

    fn publish_state(&self) {
        let state = PlayerState {
            session: self.state,
            loading: matches!(self.state, SessionState::Initializing),
            initialized: self.session.is_some(),
            switching_quality: matches!(self.state, SessionState::Switching),
            buffering: self.buffering,
            playing: self.playing,
            loop_mode: self.loop_mode,
            error: self.error.clone(),
            current_quality: self.session.as_ref().map(|s| s.quality.clone()),
            available_qualities: self
                .session
                .as_ref()
                .map(|s| s.qualities.clone())
                .unwrap_or_default(),
            duration: self.duration,
        };
        self.state_tx.send_replace(state);
    }

    fn spawn_open(
        &mut self,
        kind: OpenKind,
        resource: ResourceId,
        qualities: Option<Vec<QualityLevel>>,
        quality: Option<QualityLevel>,
        cached_source: Option<MediaSource>,
        start_position: Option<Duration>,
    ) {
        let ctx = OpenContext {
            epoch: self.epoch,
            resource,
            qualities,
            quality,
            cached_source,
            start_position,
            config: self.config.clone(),
            deps: self.deps.clone(),
            prefs: self.prefs.clone(),
        };
        let tx = self.cmd_tx.clone();
        // Deliberately not part of the subscription group: the operation runs
        // to completion and its result is stale-guarded by epoch instead of
        // being aborted mid-open (which would leak a native handle).
        tokio::spawn(async move {
            let epoch = ctx.epoch;
            let outcome = open_stream(ctx).await;
            tx.send(Command::OpenDone {
                epoch,
                kind,
                outcome,
            })
            .await
            .ok();
        });
    }
}

enum Announce {
    Initialized,
    QualityChanged,
    Recovered,
}

// ============================================================================
// Open Operation
// ============================================================================

struct OpenContext {
    epoch: u64,
    resource: ResourceId,
    /// Known catalog, or `None` to fetch it.
    qualities: Option<Vec<QualityLevel>>,
    /// Exact level to open, or `None` to resolve the stored preference.
    quality: Option<QualityLevel>,
    /// Warm source from the preload cache, skipping the resolver round-trip.
    cached_source: Option<MediaSource>,
    /// Pre-computed (already backed-off) start position.
    start_position: Option<Duration>,
    config: PlayerConfig,
    deps: CoreConfig,
    prefs: PlayerPreferences,
}

/// Resolve, open paused, await the track, and verify the start position.
///
/// Runs outside the control loop; every await here is a cooperative
/// suspension point whose result is epoch-checked on delivery.
#[instrument(skip_all, fields(resource = %ctx.resource, epoch = ctx.epoch))]
async fn open_stream(ctx: OpenContext) -> Result<OpenedStream> {
    let resolve_policy = RetryPolicy::new(
        ctx.config.resolve_attempts,
        ctx.config.seek_verify_delay,
    );

    let qualities = match ctx.qualities {
        Some(qualities) => qualities,
        None => {
            let resolver = ctx.deps.resolver.clone();
            let resource = ctx.resource.clone();
            let infos = retry_with(resolve_policy, PlayerError::is_transient, |_| {
                let resolver = resolver.clone();
                let resource = resource.clone();
                async move { Ok(resolver.fetch_qualities(&resource).await?) }
            })
            .await?;
            quality::build_catalog(infos)?
        }
    };

    let quality = match ctx.quality {
        Some(quality) => quality,
        None => {
            let stored = ctx.prefs.last_quality_label().await;
            quality::resolve_preferred(&qualities, stored.as_deref()).clone()
        }
    };

    let source = match ctx.cached_source {
        Some(source) => source,
        None => {
            let resolver = ctx.deps.resolver.clone();
            let resource = ctx.resource.clone();
            let quality_id = quality.id().to_string();
            retry_with(resolve_policy, PlayerError::is_transient, |_| {
                let resolver = resolver.clone();
                let resource = resource.clone();
                let quality_id = quality_id.clone();
                async move { Ok(resolver.resolve_source(&resource, &quality_id).await?) }
            })
            .await?
        }
    };

    let loaded = LoadedSource::materialize(source).await?;

    let options = OpenOptions {
        // Opening unpaused before the start position is confirmed flashes the
        // wrong frame at position zero.
        start_paused: true,
        hardware_decode: matches!(ctx.prefs.decode_mode().await, DecodeMode::HardwareFirst),
        rate: 1.0,
    };
    let handle: Arc<dyn EngineHandle> = Arc::from(
        ctx.deps
            .engine
            .open(loaded.engine_source().clone(), options)
            .await?,
    );

    // Wait (bounded) for a valid track before seeking; on timeout continue
    // best-effort rather than failing the session.
    let duration = wait_for_ready(&handle, ctx.config.track_wait).await;

    let start_position = ctx.start_position.unwrap_or(Duration::ZERO);
    if !start_position.is_zero() {
        if let Err(err) = handle.seek(start_position).await {
            warn!(error = %err, "initial seek failed, continuing from stream start");
        } else {
            verify_seek(&handle, start_position, &ctx.config).await;
        }
    }

    Ok(OpenedStream {
        session: PlaybackSession {
            resource: ctx.resource,
            quality,
            qualities,
            handle,
            loaded,
            duration,
        },
        start_position,
    })
}

/// Drain engine events until a valid video track shows up, collecting the
/// duration along the way. Bounded by `wait`; a timeout is not an error.
async fn wait_for_ready(handle: &Arc<dyn EngineHandle>, wait: Duration) -> Option<Duration> {
    let mut stream = handle.subscribe().await;
    let mut duration = None;

    let result = tokio::time::timeout(wait, async {
        while let Some(event) = stream.next().await {
            match event {
                EngineEvent::TrackReady(track) if track.is_valid() => return true,
                EngineEvent::DurationKnown(d) => duration = Some(d),
                _ => {}
            }
        }
        false
    })
    .await;

    match result {
        Ok(true) => debug!("video track ready"),
        Ok(false) => debug!("engine event stream ended before a track was ready"),
        Err(_) => warn!("track wait timed out, continuing best-effort"),
    }
    duration
}
