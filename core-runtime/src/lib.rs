//! # Core Runtime
//!
//! Runtime plumbing shared by the playback core crates:
//! - [`config`] - bridge dependency wiring with fail-fast validation
//! - [`events`] - typed broadcast event bus
//! - [`logging`] - `tracing-subscriber` setup and log-hygiene helpers

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, PlaybackEvent, SessionEvent};
