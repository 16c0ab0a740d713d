//! # Source Materialization
//!
//! Turns a resolver [`MediaSource`] into something the engine can open. A
//! direct URL passes straight through; playlist text is written to a named
//! temp file whose guard lives exactly as long as the session, so the
//! document is never held in memory past resolution and the file is deleted
//! at teardown without a separate cleanup pass.

use crate::error::{PlayerError, Result};
use bridge_traits::{EngineSource, MediaSource};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

/// A playable source plus ownership of any backing temp file.
#[derive(Debug)]
pub struct LoadedSource {
    engine_source: EngineSource,
    // Dropping the guard deletes the materialized playlist file.
    _playlist_guard: Option<NamedTempFile>,
}

impl LoadedSource {
    /// Materialize a resolved source.
    pub async fn materialize(source: MediaSource) -> Result<Self> {
        match source {
            MediaSource::Url(url) => Ok(Self {
                engine_source: EngineSource::RemoteUrl(url),
                _playlist_guard: None,
            }),
            MediaSource::Playlist(text) => {
                let guard = tokio::task::spawn_blocking(move || write_playlist(&text))
                    .await
                    .map_err(|e| PlayerError::Internal(format!("materialize task failed: {}", e)))??;

                debug!(path = %guard.path().display(), "materialized playlist document");
                Ok(Self {
                    engine_source: EngineSource::LocalFile(guard.path().to_path_buf()),
                    _playlist_guard: Some(guard),
                })
            }
        }
    }

    /// The location to hand to the engine's open call.
    pub fn engine_source(&self) -> &EngineSource {
        &self.engine_source
    }
}

fn write_playlist(text: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("vpc-playlist-")
        .suffix(".m3u8")
        .tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}
