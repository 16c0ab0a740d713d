//! Media resource resolution.
//!
//! The host's network layer knows how to turn a resource identifier and a
//! quality id into something playable. The core never performs HTTP itself;
//! it asks the resolver and hands the result to the engine (materializing
//! playlist text to a temp file first).

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Identifies one playable item. Long-form content is split into parts; a
/// single-part video always uses part 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub video_id: String,
    pub part: u32,
}

impl ResourceId {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            part: 1,
        }
    }

    pub fn with_part(video_id: impl Into<String>, part: u32) -> Self {
        Self {
            video_id: video_id.into(),
            part,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/p{}", self.video_id, self.part)
    }
}

/// One quality level as the backend advertises it. The id is opaque to the
/// host; height and frame rate are what the core orders and labels by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityInfo {
    pub id: String,
    pub height: u32,
    pub frame_rate: u32,
}

/// Playable media as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Direct stream URL, handed to the engine as-is.
    Url(String),
    /// Playlist document body. Must be materialized to a file before the
    /// engine sees it; never held unbounded in memory past session end.
    Playlist(String),
}

/// Resolves resource identifiers into quality lists and playable sources.
#[async_trait::async_trait]
pub trait MediaResourceResolver: Send + Sync {
    /// List the quality levels available for a resource. Fails with
    /// [`BridgeError::UnknownResource`](crate::BridgeError::UnknownResource)
    /// for unknown ids; an empty list means the resource exists but has
    /// nothing playable.
    async fn fetch_qualities(&self, resource: &ResourceId) -> Result<Vec<QualityInfo>>;

    /// Resolve a (resource, quality) pair into a playable source.
    async fn resolve_source(&self, resource: &ResourceId, quality_id: &str) -> Result<MediaSource>;
}
