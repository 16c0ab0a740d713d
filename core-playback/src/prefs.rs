//! # Player Preferences
//!
//! Typed accessor over the host [`SettingsStore`] for the handful of values
//! the player persists. Reads are forgiving: a missing or failing store just
//! yields the default, since preferences must never block playback.

use bridge_traits::SettingsStore;
use std::sync::Arc;
use tracing::warn;

const KEY_LAST_QUALITY: &str = "player.last_quality";
const KEY_LOOP_MODE: &str = "player.loop_mode";
const KEY_DECODE_MODE: &str = "player.decode_mode";
const KEY_BACKGROUND_PLAY: &str = "player.background_play";

/// Preferred decode path for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Try hardware decoding, let the engine fall back itself.
    #[default]
    HardwareFirst,
    /// Force software decoding (some devices glitch on hardware paths).
    Software,
}

impl DecodeMode {
    fn as_str(self) -> &'static str {
        match self {
            DecodeMode::HardwareFirst => "hardware",
            DecodeMode::Software => "software",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "software" => DecodeMode::Software,
            _ => DecodeMode::HardwareFirst,
        }
    }
}

/// Typed view of the persisted player preferences.
#[derive(Clone)]
pub struct PlayerPreferences {
    store: Arc<dyn SettingsStore>,
}

impl PlayerPreferences {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub async fn last_quality_label(&self) -> Option<String> {
        match self.store.get_string(KEY_LAST_QUALITY).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "failed to read stored quality preference");
                None
            }
        }
    }

    pub async fn set_last_quality_label(&self, label: &str) {
        if let Err(err) = self.store.set_string(KEY_LAST_QUALITY, label).await {
            warn!(error = %err, "failed to persist quality preference");
        }
    }

    pub async fn loop_mode(&self) -> bool {
        self.store
            .get_bool(KEY_LOOP_MODE)
            .await
            .unwrap_or_default()
            .unwrap_or(false)
    }

    pub async fn set_loop_mode(&self, enabled: bool) {
        if let Err(err) = self.store.set_bool(KEY_LOOP_MODE, enabled).await {
            warn!(error = %err, "failed to persist loop mode");
        }
    }

    pub async fn decode_mode(&self) -> DecodeMode {
        match self.store.get_string(KEY_DECODE_MODE).await {
            Ok(Some(value)) => DecodeMode::parse(&value),
            _ => DecodeMode::default(),
        }
    }

    pub async fn set_decode_mode(&self, mode: DecodeMode) {
        if let Err(err) = self.store.set_string(KEY_DECODE_MODE, mode.as_str()).await {
            warn!(error = %err, "failed to persist decode mode");
        }
    }

    pub async fn background_play(&self) -> bool {
        self.store
            .get_bool(KEY_BACKGROUND_PLAY)
            .await
            .unwrap_or_default()
            .unwrap_or(false)
    }

    pub async fn set_background_play(&self, enabled: bool) {
        if let Err(err) = self.store.set_bool(KEY_BACKGROUND_PLAY, enabled).await {
            warn!(error = %err, "failed to persist background play toggle");
        }
    }
}
