//! Controller settings (JSON file, env override for the API key).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::WAV_HEADER_LEN;
use crate::error::{BridgeError, Result};

/// Environment variable that overrides `apiKey`.
pub const API_KEY_ENV: &str = "NPC_BRIDGE_API_KEY";

const MAX_POOL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct BridgeConfig {
    /// Backend API key passed to client initialisation.
    pub api_key: Option<String>,
    /// Pre-allocated audio response records. Default: 10.
    pub audio_pool_capacity: usize,
    /// Pre-allocated viseme frame records. Default: 10.
    pub viseme_pool_capacity: usize,
    /// Strip a WAV header from response audio before decoding.
    pub trim_wav_header: bool,
    /// Header size stripped when `trim_wav_header` is set. Default: 44.
    pub wav_header_len: usize,
    /// Let the browser capture microphone audio.
    pub enable_recorder: bool,
    /// Let the browser play response audio itself.
    pub enable_player: bool,
    /// Resample decoded clips to this rate before queueing. `None` keeps the
    /// backend rate.
    pub playback_sample_rate: Option<u32>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            audio_pool_capacity: 10,
            viseme_pool_capacity: 10,
            trim_wav_header: false,
            wav_header_len: WAV_HEADER_LEN,
            enable_recorder: true,
            enable_player: false,
            playback_sample_rate: None,
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file, apply the env override, and normalize.
    ///
    /// # Errors
    /// `BridgeError::Io` if the file cannot be read, `BridgeError::Config` if
    /// it is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mut config = Self::from_json(&raw)?;
        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok().as_deref());
        config.normalize();
        info!(path = %path.display(), "bridge config loaded");
        Ok(config)
    }

    /// Parse and normalize without touching the environment.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)
            .map_err(|e| BridgeError::Config(format!("invalid bridge config: {e}")))?;
        config.normalize();
        Ok(config)
    }

    /// Replace the API key with `value` when it is non-blank. A blank or
    /// unset variable keeps the key from the file.
    pub fn apply_api_key_override(&mut self, value: Option<&str>) {
        if let Some(key) = value.map(str::trim).filter(|k| !k.is_empty()) {
            self.api_key = Some(key.to_string());
        }
    }

    pub fn normalize(&mut self) {
        self.audio_pool_capacity = self.audio_pool_capacity.clamp(1, MAX_POOL_CAPACITY);
        self.viseme_pool_capacity = self.viseme_pool_capacity.clamp(1, MAX_POOL_CAPACITY);
        self.api_key = self
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.playback_sample_rate = self.playback_sample_rate.filter(|r| *r > 0);
    }

    /// Bytes to skip at the front of response audio.
    pub fn header_trim(&self) -> usize {
        if self.trim_wav_header {
            self.wav_header_len
        } else {
            0
        }
    }
}
