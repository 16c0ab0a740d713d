//! Behavioral tests for the session lifecycle coordinator.
//!
//! All suites run on a paused clock; timer-driven behavior (debounce windows,
//! stall timeouts, preload delays) is exercised by letting virtual time
//! advance, never by real sleeping.

mod common;

use bridge_traits::{EngineEvent, ResourceId};
use common::{settle, wait_for, Harness};
use core_runtime::events::{CoreEvent, PlaybackEvent, SessionEvent};
use std::time::Duration;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ============================================================================
// Initialize
// ============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_initialize_same_resource_opens_once() {
    let h = Harness::new();
    let resource = ResourceId::new("BV1xx411");

    h.controller
        .initialize(resource.clone(), None)
        .await
        .unwrap();
    h.controller
        .initialize(resource.clone(), None)
        .await
        .unwrap();
    h.controller.initialize(resource, None).await.unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| s.initialized).await;
    settle().await;

    assert_eq!(h.engine.open_count(), 1);
    assert_eq!(*h.resolver.fetch_calls.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn initialize_for_a_different_resource_supersedes() {
    let h = Harness::new();

    h.controller
        .initialize(ResourceId::new("BV1aaa111"), None)
        .await
        .unwrap();
    h.controller
        .initialize(ResourceId::new("BV1bbb222"), None)
        .await
        .unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| s.initialized).await;
    settle().await;

    // Both opens ran, but exactly one session survived; the superseded
    // completion disposed its own handle.
    assert_eq!(h.engine.open_count(), 2);
    let live: Vec<bool> = (0..2).map(|i| !h.engine.handle(i).is_disposed()).collect();
    assert_eq!(live.iter().filter(|&&alive| alive).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn resume_backs_off_from_the_stored_position() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), Some(secs(40))).await;

    // Resume at 40s seeks to 38s, not 40s.
    assert_eq!(h.engine.handle(0).seeks(), vec![secs(38)]);
    assert_eq!(*h.controller.ui_position().borrow(), secs(38));
}

#[tokio::test(start_paused = true)]
async fn resume_from_zero_does_not_seek() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), Some(Duration::ZERO)).await;

    assert!(h.engine.handle(0).seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn initialize_opens_paused_and_resolves_stored_preference() {
    let h = Harness::with_settings(common::MemorySettings::with_quality("720p"));
    h.ready(ResourceId::new("BV1xx411"), None).await;

    let (_, options) = h.engine.opens.lock().unwrap()[0].clone();
    assert!(options.start_paused);

    let state = h.controller.state().borrow().clone();
    assert_eq!(state.current_quality.unwrap().id(), "q64");
    assert!(!state.playing);
}

#[tokio::test(start_paused = true)]
async fn empty_quality_list_surfaces_resource_unavailable() {
    let h = Harness::new();
    h.resolver.qualities.lock().unwrap().clear();

    h.controller
        .initialize(ResourceId::new("BV1xx411"), None)
        .await
        .unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| s.error.is_some()).await;

    let error = state.borrow().error.clone().unwrap();
    assert!(!error.recoverable);
    assert_eq!(h.engine.open_count(), 0);
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test(start_paused = true)]
async fn progress_is_throttled_and_never_zero_after_start() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;

    let handle = h.engine.handle(0);
    handle.push_position(Duration::ZERO);
    handle.push_position(Duration::from_millis(1000));
    handle.push_position(Duration::from_millis(1200)); // below throttle
    handle.push_position(Duration::from_millis(2000));
    handle.push_position(Duration::ZERO); // startup artifact replay
    handle.push_position(Duration::from_millis(3000));
    settle().await;

    let mut reported = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Playback(PlaybackEvent::ProgressUpdate { position_ms, .. }) = event {
            reported.push(position_ms);
        }
    }
    assert_eq!(reported, vec![1000, 2000, 3000]);

    // The persistence sink saw the same filtered sequence.
    assert_eq!(
        h.sink.positions(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(3000)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn ui_position_follows_raw_events() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;

    let handle = h.engine.handle(0);
    handle.push_position(secs(7));
    settle().await;

    assert_eq!(*h.controller.ui_position().borrow(), secs(7));
}

// ============================================================================
// Seeking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn later_seek_wins_over_unconfirmed_earlier_one() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    let handle = h.engine.handle(0);
    handle.push_position(secs(5));
    settle().await;

    h.controller.seek(secs(100)).await.unwrap();
    h.controller.seek(secs(200)).await.unwrap();
    settle().await;

    assert_eq!(handle.seeks(), vec![secs(100), secs(200)]);
    assert_eq!(*h.controller.ui_position().borrow(), secs(200));

    // The engine settles near the later target; progress resumes there.
    handle.push_position(secs(201));
    settle().await;
    assert_eq!(*h.controller.ui_position().borrow(), secs(201));
}

// ============================================================================
// Quality Switching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn rapid_switch_requests_collapse_into_one() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    let first = h.engine.handle(0);
    first.push_position(secs(10));
    settle().await;

    // Three requests inside one debounce window.
    h.controller.change_quality("q80").await.unwrap();
    h.controller.change_quality("q32").await.unwrap();
    h.controller.change_quality("q16").await.unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| {
        !s.switching_quality
            && s.current_quality.as_ref().map(|q| q.id().to_string())
                == Some("q16".to_string())
    })
    .await;
    settle().await;

    // Exactly one switch executed (initial open + one reopen), targeting the
    // position captured at the last request, minus the boundary back-off.
    assert_eq!(h.engine.open_count(), 2);
    assert_eq!(h.engine.handle(1).seeks(), vec![secs(8)]);
    assert!(first.is_disposed());
}

#[tokio::test(start_paused = true)]
async fn switch_to_current_quality_is_a_no_op() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;

    // Default preference resolution picked q64.
    h.controller.change_quality("q64").await.unwrap();
    settle().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.engine.open_count(), 1);
    assert!(!h.controller.state().borrow().switching_quality);
}

#[tokio::test(start_paused = true)]
async fn seek_then_quick_switch_rests_at_the_seek_target() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    let first = h.engine.handle(0);
    first.push_position(secs(5));
    settle().await;

    // User seeks to 40s, then switches quality within the same second.
    h.controller.seek(secs(40)).await.unwrap();
    h.controller.change_quality("q80").await.unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| {
        !s.switching_quality
            && s.current_quality.as_ref().map(|q| q.id().to_string())
                == Some("q80".to_string())
    })
    .await;
    settle().await;

    // Final resting position: the seek target minus back-off, never zero.
    let second = h.engine.handle(1);
    assert_eq!(second.seeks(), vec![secs(38)]);
    assert_eq!(*h.controller.ui_position().borrow(), secs(38));
}

#[tokio::test(start_paused = true)]
async fn switch_restores_play_state_and_serves_from_preload_cache() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    h.controller.play().await.unwrap();
    let first = h.engine.handle(0);
    first.push_position(secs(30));

    // Let the preload timer fire and the adjacent fetches land.
    tokio::time::sleep(secs(6)).await;
    settle().await;
    let resolved_before = h.resolver.resolved_qualities().len();
    assert!(resolved_before >= 3); // initial + two adjacent prefetches

    h.controller.change_quality("q80").await.unwrap();
    let mut state = h.controller.state();
    wait_for(&mut state, |s| {
        s.playing
            && s.current_quality.as_ref().map(|q| q.id().to_string())
                == Some("q80".to_string())
    })
    .await;
    settle().await;

    // q80 was adjacent (one step up from q64): its source came from the
    // preload cache, so no new resolve happened for the switch itself.
    let resolves: Vec<String> = h.resolver.resolved_qualities();
    assert_eq!(
        resolves[..resolved_before]
            .iter()
            .filter(|q| q.as_str() == "q80")
            .count(),
        1,
        "q80 resolved once during prefetch"
    );
    assert!(h.engine.last_handle().playing.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn failed_switch_keeps_the_previous_session() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    h.controller.play().await.unwrap();
    let first = h.engine.handle(0);
    first.push_position(secs(10));
    settle().await;

    h.engine.fail_next_open();
    h.controller.change_quality("q80").await.unwrap();

    let mut state = h.controller.state();
    wait_for(&mut state, |s| s.error.is_some() && !s.switching_quality).await;
    settle().await;

    // The user keeps watching the old quality; play state restored.
    let snapshot = state.borrow().clone();
    assert_eq!(snapshot.current_quality.unwrap().id(), "q64");
    assert!(snapshot.playing);
    assert!(!first.is_disposed());
    assert_eq!(h.engine.open_count(), 1);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Session(SessionEvent::Error { recoverable, .. }) = event {
            saw_error = true;
            assert!(recoverable);
        }
    }
    assert!(saw_error);
}

// ============================================================================
// Stall Detection & Recovery
// ============================================================================

#[tokio::test(start_paused = true)]
async fn continuous_buffering_triggers_exactly_one_recovery() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    h.controller.play().await.unwrap();
    let first = h.engine.handle(0);
    first.push_position(secs(42));
    settle().await;

    first.push(EngineEvent::Buffering(true));
    settle().await;

    // Sit in buffering well past the stall window.
    tokio::time::sleep(secs(30)).await;

    let mut state = h.controller.state();
    wait_for(&mut state, |s| {
        s.session == core_playback::SessionState::Ready && s.initialized
    })
    .await;
    settle().await;

    // One recovery reopen, not one per monitoring tick.
    assert_eq!(h.engine.open_count(), 2);
    assert!(first.is_disposed());

    // Recovery seeks near the last intended position and restores playback.
    let second = h.engine.handle(1);
    assert_eq!(second.seeks(), vec![secs(40)]);
    assert!(second.playing.load(std::sync::atomic::Ordering::SeqCst));

    let mut saw_stalled = false;
    let mut saw_recovered = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Playback(PlaybackEvent::Stalled) => saw_stalled = true,
            CoreEvent::Playback(PlaybackEvent::Recovered) => saw_recovered = true,
            _ => {}
        }
    }
    assert!(saw_stalled);
    assert!(saw_recovered);
}

#[tokio::test(start_paused = true)]
async fn short_buffering_blip_does_not_recover() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    let handle = h.engine.handle(0);
    handle.push_position(secs(10));
    settle().await;

    handle.push(EngineEvent::Buffering(true));
    settle().await;
    tokio::time::sleep(secs(2)).await;
    handle.push(EngineEvent::Buffering(false));
    settle().await;

    // Even long after the original window would have fired.
    tokio::time::sleep(secs(30)).await;
    settle().await;

    assert_eq!(h.engine.open_count(), 1);
    assert!(!handle.is_disposed());
}

// ============================================================================
// Loop Mode & Completion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn completion_with_loop_mode_restarts_from_zero() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    h.controller.set_loop_mode(true).await.unwrap();
    let handle = h.engine.handle(0);
    handle.push_position(secs(599));
    settle().await;

    handle.push(EngineEvent::Completed);
    settle().await;

    assert_eq!(handle.seeks(), vec![Duration::ZERO]);
    assert!(handle.playing.load(std::sync::atomic::Ordering::SeqCst));

    // Loop restarts never surface as video-end.
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(
            event,
            CoreEvent::Playback(PlaybackEvent::VideoEnd)
        ));
    }

    // And the restart accepts low positions again.
    handle.push_position(secs(1));
    settle().await;
    assert_eq!(*h.controller.ui_position().borrow(), secs(1));
}

#[tokio::test(start_paused = true)]
async fn completion_without_loop_mode_surfaces_video_end() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    h.controller.play().await.unwrap();
    let handle = h.engine.handle(0);
    handle.push_position(secs(599));
    settle().await;

    handle.push(EngineEvent::Completed);
    settle().await;

    assert!(!h.controller.state().borrow().playing);
    let mut saw_end = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Playback(PlaybackEvent::VideoEnd)) {
            saw_end = true;
        }
    }
    assert!(saw_end);
}

// ============================================================================
// Dispose
// ============================================================================

#[tokio::test(start_paused = true)]
async fn dispose_tears_down_and_silences_callbacks() {
    let h = Harness::new();
    let mut events = h.controller.subscribe_events();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    let handle = h.engine.handle(0);
    handle.push_position(secs(10));
    settle().await;

    h.controller.dispose().await.unwrap();

    let snapshot = h.controller.state().borrow().clone();
    assert_eq!(snapshot.session, core_playback::SessionState::Idle);
    assert!(!snapshot.initialized);
    assert!(handle.is_disposed());
    assert_eq!(*h.controller.ui_position().borrow(), Duration::ZERO);

    // Drain everything up to the teardown notification.
    let mut saw_disposed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Session(SessionEvent::Disposed)) {
            saw_disposed = true;
        }
    }
    assert!(saw_disposed);

    // Events pushed after dispose never reach the controller.
    handle.push_position(secs(50));
    handle.push(EngineEvent::Buffering(true));
    settle().await;
    tokio::time::sleep(secs(30)).await;
    settle().await;

    assert!(events.try_recv().is_err());
    assert_eq!(*h.controller.ui_position().borrow(), Duration::ZERO);
    assert_eq!(h.engine.open_count(), 1);
    assert_eq!(h.controller.state().borrow().session, core_playback::SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn controller_can_reinitialize_after_dispose() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1aaa111"), None).await;
    h.controller.dispose().await.unwrap();

    h.ready(ResourceId::new("BV1bbb222"), None).await;

    assert_eq!(h.engine.open_count(), 2);
    assert!(h.engine.handle(0).is_disposed());
    assert!(!h.engine.handle(1).is_disposed());
}

// ============================================================================
// Preferences
// ============================================================================

#[tokio::test(start_paused = true)]
async fn selected_quality_label_is_persisted() {
    let h = Harness::new();
    h.ready(ResourceId::new("BV1xx411"), None).await;
    settle().await;

    assert_eq!(
        h.settings
            .strings
            .lock()
            .unwrap()
            .get("player.last_quality")
            .map(String::as_str),
        Some("720p")
    );
}
