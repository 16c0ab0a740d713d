//! Settings and progress persistence abstractions.
//!
//! Provides platform-agnostic traits for key-value preference storage and for
//! the watch-progress sink. Both are simple by design: the core treats them
//! as best-effort collaborators and never blocks playback on them.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::resolver::ResourceId;

/// Key-value preferences storage.
///
/// Backed per platform by whatever the host uses for settings (SQLite,
/// SharedPreferences, UserDefaults, a JSON file). Keys are namespaced by the
/// caller.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

/// Sink for throttled watch-progress reports.
///
/// Implementations forward to the backend (and retry there if they want to);
/// the core fires and forgets. Reports never carry position zero; the core
/// filters startup artifacts before they get here.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(
        &self,
        resource: &ResourceId,
        position: Duration,
        total: Option<Duration>,
    ) -> Result<()>;
}
