//! Shared mock bridges for the behavioral test suites.
//!
//! The mock engine is scripted: tests push `EngineEvent`s into a handle and
//! observe the control calls (open/seek/play/pause/dispose) the core made in
//! response.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, EngineEvent, EngineEventStream, EngineHandle, EngineSource, MediaSource,
    NativeEngineAdapter, OpenOptions, ProgressSink, QualityInfo, ResourceId, SettingsStore,
    VideoTrack,
};
use core_playback::controller::{PlayerController, PlayerState};
use core_playback::PlayerConfig;
use core_runtime::CoreConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

// ============================================================================
// Mock Engine
// ============================================================================

pub struct MockEngine {
    pub handles: Mutex<Vec<Arc<MockHandleState>>>,
    pub opens: Mutex<Vec<(EngineSource, OpenOptions)>>,
    pub fail_next_open: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(Vec::new()),
            opens: Mutex::new(Vec::new()),
            fail_next_open: AtomicBool::new(false),
        })
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    /// State of the `index`-th opened handle.
    pub fn handle(&self, index: usize) -> Arc<MockHandleState> {
        self.handles.lock().unwrap()[index].clone()
    }

    pub fn last_handle(&self) -> Arc<MockHandleState> {
        self.handles.lock().unwrap().last().unwrap().clone()
    }

    pub fn fail_next_open(&self) {
        self.fail_next_open.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NativeEngineAdapter for MockEngine {
    async fn open(
        &self,
        source: EngineSource,
        options: OpenOptions,
    ) -> BridgeResult<Box<dyn EngineHandle>> {
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("scripted open failure".into()));
        }

        self.opens.lock().unwrap().push((source, options));
        let (events, _) = broadcast::channel(256);
        let state = Arc::new(MockHandleState {
            position: Mutex::new(Duration::ZERO),
            playing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            seeks: Mutex::new(Vec::new()),
            rates: Mutex::new(Vec::new()),
            events,
        });
        self.handles.lock().unwrap().push(state.clone());
        Ok(Box::new(MockHandle { state }))
    }
}

pub struct MockHandleState {
    pub position: Mutex<Duration>,
    pub playing: AtomicBool,
    pub disposed: AtomicBool,
    pub seeks: Mutex<Vec<Duration>>,
    pub rates: Mutex<Vec<f32>>,
    pub events: broadcast::Sender<EngineEvent>,
}

impl MockHandleState {
    /// Push an event to every live subscription of this handle.
    pub fn push(&self, event: EngineEvent) {
        self.events.send(event).ok();
    }

    pub fn push_position(&self, position: Duration) {
        *self.position.lock().unwrap() = position;
        self.push(EngineEvent::Position(position));
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct MockHandle {
    state: Arc<MockHandleState>,
}

#[async_trait]
impl EngineHandle for MockHandle {
    async fn play(&self) -> BridgeResult<()> {
        self.state.playing.store(true, Ordering::SeqCst);
        self.state.push(EngineEvent::Playing(true));
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.state.playing.store(false, Ordering::SeqCst);
        self.state.push(EngineEvent::Playing(false));
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        self.state.seeks.lock().unwrap().push(position);
        // The mock engine lands exactly on target.
        *self.state.position.lock().unwrap() = position;
        Ok(())
    }

    async fn set_rate(&self, rate: f32) -> BridgeResult<()> {
        self.state.rates.lock().unwrap().push(rate);
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        Ok(*self.state.position.lock().unwrap())
    }

    async fn subscribe(&self) -> Box<dyn EngineEventStream> {
        let receiver = self.state.events.subscribe();
        // A freshly probed stream knows its track and duration right away.
        self.state.push(EngineEvent::TrackReady(VideoTrack {
            width: 1920,
            height: 1080,
            frame_rate: Some(30.0),
        }));
        self.state
            .push(EngineEvent::DurationKnown(Duration::from_secs(600)));
        Box::new(MockEventStream { receiver })
    }

    async fn dispose(&self) -> BridgeResult<()> {
        self.state.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockEventStream {
    receiver: broadcast::Receiver<EngineEvent>,
}

#[async_trait]
impl EngineEventStream for MockEventStream {
    async fn next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// Mock Resolver
// ============================================================================

pub struct MockResolver {
    pub qualities: Mutex<Vec<QualityInfo>>,
    pub source_calls: Mutex<Vec<String>>,
    pub fetch_calls: Mutex<u32>,
}

impl MockResolver {
    /// Four-tier catalog: 1080p / 720p / 480p / 360p.
    pub fn standard() -> Arc<Self> {
        Arc::new(Self {
            qualities: Mutex::new(vec![
                quality_info("q80", 1080, 30),
                quality_info("q64", 720, 30),
                quality_info("q32", 480, 30),
                quality_info("q16", 360, 30),
            ]),
            source_calls: Mutex::new(Vec::new()),
            fetch_calls: Mutex::new(0),
        })
    }

    pub fn resolved_qualities(&self) -> Vec<String> {
        self.source_calls.lock().unwrap().clone()
    }
}

pub fn quality_info(id: &str, height: u32, frame_rate: u32) -> QualityInfo {
    QualityInfo {
        id: id.to_string(),
        height,
        frame_rate,
    }
}

#[async_trait]
impl bridge_traits::MediaResourceResolver for MockResolver {
    async fn fetch_qualities(&self, _resource: &ResourceId) -> BridgeResult<Vec<QualityInfo>> {
        *self.fetch_calls.lock().unwrap() += 1;
        Ok(self.qualities.lock().unwrap().clone())
    }

    async fn resolve_source(
        &self,
        resource: &ResourceId,
        quality_id: &str,
    ) -> BridgeResult<MediaSource> {
        self.source_calls.lock().unwrap().push(quality_id.to_string());
        Ok(MediaSource::Url(format!(
            "https://cdn.example.com/{}/{}.m3u8",
            resource.video_id, quality_id
        )))
    }
}

// ============================================================================
// In-memory Settings & Progress Sink
// ============================================================================

#[derive(Default)]
pub struct MemorySettings {
    pub strings: Mutex<HashMap<String, String>>,
    pub bools: Mutex<HashMap<String, bool>>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_quality(label: &str) -> Arc<Self> {
        let settings = Self::default();
        settings
            .strings
            .lock()
            .unwrap()
            .insert("player.last_quality".to_string(), label.to_string());
        Arc::new(settings)
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.strings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.strings.lock().unwrap().get(key).cloned())
    }

    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.bools.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.bools.lock().unwrap().get(key).copied())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.strings.lock().unwrap().remove(key);
        self.bools.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<(ResourceId, Duration, Option<Duration>)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn positions(&self) -> Vec<Duration> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p, _)| *p)
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(
        &self,
        resource: &ResourceId,
        position: Duration,
        total: Option<Duration>,
    ) -> BridgeResult<()> {
        self.reports
            .lock()
            .unwrap()
            .push((resource.clone(), position, total));
        Ok(())
    }
}

// ============================================================================
// Mock OS Signal Observers
// ============================================================================

pub struct MockInterruptions {
    sender: broadcast::Sender<bridge_traits::AudioInterruption>,
}

impl MockInterruptions {
    pub fn new() -> Arc<Self> {
        let (sender, _) = broadcast::channel(16);
        Arc::new(Self { sender })
    }

    pub fn fire(&self, event: bridge_traits::AudioInterruption) {
        self.sender.send(event).ok();
    }
}

#[async_trait]
impl bridge_traits::AudioInterruptionObserver for MockInterruptions {
    async fn subscribe_changes(
        &self,
    ) -> BridgeResult<Box<dyn bridge_traits::AudioInterruptionStream>> {
        Ok(Box::new(BroadcastStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

pub struct MockLifecycle {
    sender: broadcast::Sender<bridge_traits::LifecycleState>,
    state: Mutex<bridge_traits::LifecycleState>,
}

impl MockLifecycle {
    pub fn new() -> Arc<Self> {
        let (sender, _) = broadcast::channel(16);
        Arc::new(Self {
            sender,
            state: Mutex::new(bridge_traits::LifecycleState::Foreground),
        })
    }

    pub fn transition(&self, state: bridge_traits::LifecycleState) {
        *self.state.lock().unwrap() = state;
        self.sender.send(state).ok();
    }
}

#[async_trait]
impl bridge_traits::LifecycleObserver for MockLifecycle {
    async fn state(&self) -> BridgeResult<bridge_traits::LifecycleState> {
        Ok(*self.state.lock().unwrap())
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn bridge_traits::LifecycleChangeStream>> {
        Ok(Box::new(BroadcastStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

pub struct MockNetwork {
    sender: broadcast::Sender<bridge_traits::NetworkStatus>,
    status: Mutex<bridge_traits::NetworkStatus>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        let (sender, _) = broadcast::channel(16);
        Arc::new(Self {
            sender,
            status: Mutex::new(bridge_traits::NetworkStatus::Connected),
        })
    }

    pub fn set_status(&self, status: bridge_traits::NetworkStatus) {
        *self.status.lock().unwrap() = status;
        self.sender.send(status).ok();
    }
}

#[async_trait]
impl bridge_traits::NetworkMonitor for MockNetwork {
    async fn status(&self) -> BridgeResult<bridge_traits::NetworkStatus> {
        Ok(*self.status.lock().unwrap())
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn bridge_traits::NetworkChangeStream>> {
        Ok(Box::new(BroadcastStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

struct BroadcastStream<T> {
    receiver: broadcast::Receiver<T>,
}

#[async_trait]
impl bridge_traits::AudioInterruptionStream for BroadcastStream<bridge_traits::AudioInterruption> {
    async fn next(&mut self) -> Option<bridge_traits::AudioInterruption> {
        self.receiver.recv().await.ok()
    }
}

#[async_trait]
impl bridge_traits::LifecycleChangeStream for BroadcastStream<bridge_traits::LifecycleState> {
    async fn next(&mut self) -> Option<bridge_traits::LifecycleState> {
        self.receiver.recv().await.ok()
    }
}

#[async_trait]
impl bridge_traits::NetworkChangeStream for BroadcastStream<bridge_traits::NetworkStatus> {
    async fn next(&mut self) -> Option<bridge_traits::NetworkStatus> {
        self.receiver.recv().await.ok()
    }
}

// ============================================================================
// Mock Wakelock & Media Session Surface
// ============================================================================

#[derive(Default)]
pub struct MockWakeLock {
    pub held: AtomicBool,
    pub acquires: Mutex<u32>,
}

impl MockWakeLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl bridge_traits::WakeLock for MockWakeLock {
    async fn acquire(&self) -> BridgeResult<()> {
        self.held.store(true, Ordering::SeqCst);
        *self.acquires.lock().unwrap() += 1;
        Ok(())
    }

    async fn release(&self) -> BridgeResult<()> {
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMediaSession {
    pub active: AtomicBool,
    pub playing_updates: Mutex<Vec<bool>>,
}

impl MockMediaSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl bridge_traits::MediaSessionSurface for MockMediaSession {
    async fn activate(&self, _metadata: bridge_traits::MediaMetadata) -> BridgeResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn set_playing(&self, playing: bool) -> BridgeResult<()> {
        self.playing_updates.lock().unwrap().push(playing);
        Ok(())
    }

    async fn deactivate(&self) -> BridgeResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: PlayerController,
    pub engine: Arc<MockEngine>,
    pub resolver: Arc<MockResolver>,
    pub settings: Arc<MemorySettings>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(MemorySettings::new())
    }

    pub fn with_settings(settings: Arc<MemorySettings>) -> Self {
        let engine = MockEngine::new();
        let resolver = MockResolver::standard();
        let sink = RecordingSink::new();

        let deps = CoreConfig::builder()
            .engine(engine.clone())
            .resolver(resolver.clone())
            .settings_store(settings.clone())
            .progress_sink(sink.clone())
            .build()
            .unwrap();
        let controller = PlayerController::new(PlayerConfig::default(), deps).unwrap();

        Self {
            controller,
            engine,
            resolver,
            settings,
            sink,
        }
    }

    /// Initialize and wait until the session is ready.
    pub async fn ready(&self, resource: ResourceId, resume: Option<Duration>) {
        self.controller.initialize(resource, resume).await.unwrap();
        let mut state = self.controller.state();
        wait_for(&mut state, |s| s.initialized && !s.loading).await;
    }
}

/// Wait (bounded) until the observable state satisfies the predicate.
pub async fn wait_for<F>(state: &mut watch::Receiver<PlayerState>, predicate: F)
where
    F: Fn(&PlayerState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(120), async {
        loop {
            if predicate(&state.borrow()) {
                return;
            }
            state.changed().await.expect("controller stopped");
        }
    })
    .await
    .expect("state predicate never satisfied");
}

/// Let queued commands and spawned tasks drain.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
