//! # Playback Control Core
//!
//! The adaptive-bitrate playback control core: the layer between a UI and a
//! native decode/render engine that coordinates quality selection, seeking,
//! stall detection/recovery, and progress persistence for HTTP-segmented
//! video streams.
//!
//! ## Overview
//!
//! - [`controller::PlayerController`] - session lifecycle coordinator; an
//!   actor whose control loop owns all mutable state
//! - [`quality`] - quality catalog: ordering, labels, preference resolution
//! - [`progress::ProgressTracker`] - the authoritative intended position and
//!   progress filtering
//! - [`stall::StallMonitor`] - buffering timeout tracking and recovery gating
//! - [`switcher::QualitySwitcher`] - debounced quality-change sequencing
//! - [`background::BackgroundAudioCoordinator`] - OS signal reconciliation
//! - [`retry`] - the one bounded-retry primitive used by every
//!   poll-and-retry site
//!
//! Host platforms inject their engine, resolver, and storage through
//! `core_runtime::CoreConfig`; see `bridge-traits` for the contracts.

pub mod background;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod prefs;
pub mod progress;
pub mod quality;
pub mod retry;
pub mod session;
pub mod source;
pub mod stall;
pub mod switcher;

pub use background::BackgroundAudioCoordinator;
pub use config::PlayerConfig;
pub use controller::{ControlHandle, PlayerController, PlayerState, SeekReason};
pub use error::{ClassifiedError, PlayerError, Result};
pub use prefs::{DecodeMode, PlayerPreferences};
pub use quality::QualityLevel;
pub use session::SessionState;
pub use stall::StallState;
