//! # Quality Catalog
//!
//! Orders, labels, and selects quality levels. The backend hands over opaque
//! quality ids with a height and frame rate; everything the UI sees (labels,
//! ordering, the preferred pick) is derived here, deterministically.

use crate::error::{PlayerError, Result};
use bridge_traits::QualityInfo;
use serde::{Deserialize, Serialize};

/// One selectable quality level, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    info: QualityInfo,
    label: String,
}

impl QualityLevel {
    fn new(info: QualityInfo) -> Self {
        let label = display_label(info.height, info.frame_rate);
        Self { info, label }
    }

    /// Opaque backend id, passed back to the resolver verbatim.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn frame_rate(&self) -> u32 {
        self.info.frame_rate
    }

    /// Derived display label, e.g. `"1080p60"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Ordering key: resolution first, frame rate as tie-break.
    fn score(&self) -> (u32, u32) {
        (self.info.height, self.info.frame_rate)
    }
}

/// Build the ordered catalog from the backend's quality list.
///
/// Levels are sorted by resolution descending with frame rate as a
/// descending tie-break. An empty list fails with
/// [`PlayerError::ResourceUnavailable`].
pub fn build_catalog(infos: Vec<QualityInfo>) -> Result<Vec<QualityLevel>> {
    if infos.is_empty() {
        return Err(PlayerError::ResourceUnavailable(
            "no quality levels available".to_string(),
        ));
    }

    let mut levels: Vec<QualityLevel> = infos.into_iter().map(QualityLevel::new).collect();
    levels.sort_by(|a, b| b.score().cmp(&a.score()));
    Ok(levels)
}

/// Resolve the preferred level against a stored label.
///
/// Selection order:
/// 1. Exact label match with the stored preference.
/// 2. The best level strictly below the stored preference (next-lower
///    resolution/frame-rate).
/// 3. Default policy: the second-highest available level (the top tier is
///    often bandwidth-risky), or the sole level if only one exists.
pub fn resolve_preferred<'a>(
    levels: &'a [QualityLevel],
    stored_label: Option<&str>,
) -> &'a QualityLevel {
    debug_assert!(!levels.is_empty(), "catalog is never empty");

    if let Some(stored) = stored_label {
        if let Some(exact) = levels.iter().find(|l| l.label() == stored) {
            return exact;
        }

        if let Some(stored_score) = parse_label(stored) {
            // Levels are sorted descending, so the first one below the stored
            // preference is the closest lower choice.
            if let Some(lower) = levels.iter().find(|l| l.score() < stored_score) {
                return lower;
            }
        }
    }

    levels.get(1).unwrap_or(&levels[0])
}

/// The one-step-up and one-step-down neighbors of the current level.
///
/// Used to decide which sources the preload cache warms after a successful
/// load or switch.
pub fn adjacent<'a>(
    levels: &'a [QualityLevel],
    current_id: &str,
) -> (Option<&'a QualityLevel>, Option<&'a QualityLevel>) {
    let Some(index) = levels.iter().position(|l| l.id() == current_id) else {
        return (None, None);
    };

    let up = index.checked_sub(1).map(|i| &levels[i]);
    let down = levels.get(index + 1);
    (up, down)
}

/// Derive the display label for a (height, frame rate) pair.
///
/// Common levels come from a fixed table; anything else falls back to a
/// height bucket. Frame rates above 30 get a suffix.
pub fn display_label(height: u32, frame_rate: u32) -> String {
    let base = match height {
        2160 => "4K",
        1440 => "2K",
        1080 => "1080p",
        720 => "720p",
        480 => "480p",
        360 => "360p",
        h if h >= 2160 => "4K",
        h if h >= 1440 => "2K",
        h if h >= 1080 => "1080p",
        h if h >= 720 => "720p",
        h if h >= 480 => "480p",
        _ => "360p",
    };

    if frame_rate > 30 {
        format!("{}{}", base, frame_rate)
    } else {
        base.to_string()
    }
}

/// Parse a display label back into its (height, frame rate) score.
fn parse_label(label: &str) -> Option<(u32, u32)> {
    let (base, rate) = match label.find(|c: char| !c.is_ascii_digit()) {
        Some(split) if label[split..].starts_with('p') => {
            let height: u32 = label[..split].parse().ok()?;
            let rate = label[split + 1..].parse().unwrap_or(30);
            (height, rate)
        }
        _ if label.starts_with("4K") => (2160, label[2..].parse().unwrap_or(30)),
        _ if label.starts_with("2K") => (1440, label[2..].parse().unwrap_or(30)),
        _ => return None,
    };
    Some((base, rate))
}
