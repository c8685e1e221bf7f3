use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

/// Optional file configuration (`config/contextrec.toml`). Every field
/// falls back to the built-in defaults; CLI flags override both.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub output_dir: Option<String>,
    pub model: Option<String>,
    pub audio_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub enable_transcript: Option<bool>,
    pub enable_keystrokes: Option<bool>,
    pub enable_clipboard: Option<bool>,
    pub enable_screenshots: Option<bool>,
    pub save_audio: Option<bool>,
    pub hotkey_screenshot: Option<String>,
    pub hotkey_window_ms: Option<u64>,
    pub voice_trigger: Option<String>,
    pub voice_stop: Option<String>,
    pub vocabulary_boost: Option<Vec<String>>,
    pub clipboard_poll_interval_ms: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub source_stop_timeout_ms: Option<u64>,
    pub drain_grace_ms: Option<u64>,
    pub coalesce_gap_ms: Option<u64>,
}

impl FileConfig {
    /// Load from `path` (extension resolved by the config loader). A
    /// missing file is not an error; it simply yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .with_context(|| format!("failed to load config from {path}"))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid config in {path}"))
    }

    /// Merge file values over `base`.
    pub fn apply(self, mut base: SessionConfig) -> SessionConfig {
        if let Some(dir) = self.output_dir {
            base.output_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(model) = self.model {
            base.model = model;
        }
        if self.audio_device.is_some() {
            base.audio_device = self.audio_device;
        }
        if let Some(rate) = self.sample_rate {
            base.sample_rate = rate;
        }
        if let Some(v) = self.enable_transcript {
            base.enable_transcript = v;
        }
        if let Some(v) = self.enable_keystrokes {
            base.enable_keystrokes = v;
        }
        if let Some(v) = self.enable_clipboard {
            base.enable_clipboard = v;
        }
        if let Some(v) = self.enable_screenshots {
            base.enable_screenshots = v;
        }
        if let Some(v) = self.save_audio {
            base.save_audio = v;
        }
        if let Some(hotkey) = self.hotkey_screenshot {
            base.hotkey_screenshot = hotkey;
        }
        if let Some(ms) = self.hotkey_window_ms {
            base.hotkey_window = Duration::from_millis(ms);
        }
        if let Some(word) = self.voice_trigger {
            base.voice_trigger = word;
        }
        if let Some(phrase) = self.voice_stop {
            base.voice_stop = phrase;
        }
        if let Some(words) = self.vocabulary_boost {
            base.vocabulary_boost = words;
        }
        if let Some(ms) = self.clipboard_poll_interval_ms {
            base.clipboard_poll_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) = self.queue_capacity {
            base.queue_capacity = capacity;
        }
        if let Some(ms) = self.source_stop_timeout_ms {
            base.source_stop_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.drain_grace_ms {
            base.drain_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = self.coalesce_gap_ms {
            base.coalesce_gap = Duration::from_millis(ms);
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_config_keeps_defaults() {
        let merged = FileConfig::default().apply(SessionConfig::default());
        let defaults = SessionConfig::default();
        assert_eq!(merged.model, defaults.model);
        assert_eq!(merged.queue_capacity, defaults.queue_capacity);
        assert_eq!(merged.hotkey_screenshot, defaults.hotkey_screenshot);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = FileConfig {
            model: Some("small".to_string()),
            queue_capacity: Some(64),
            coalesce_gap_ms: Some(1500),
            ..FileConfig::default()
        };
        let merged = file.apply(SessionConfig::default());
        assert_eq!(merged.model, "small");
        assert_eq!(merged.queue_capacity, 64);
        assert_eq!(merged.coalesce_gap, Duration::from_millis(1500));
    }
}
