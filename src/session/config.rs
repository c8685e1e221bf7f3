use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory under which per-session directories are created
    pub output_dir: PathBuf,

    /// Transcription model identifier passed to the transcriber backend
    /// (e.g. "tiny", "base", "small")
    pub model: String,

    /// Audio input device name; `None` selects the backend default
    pub audio_device: Option<String>,

    /// Sample rate for audio processing (speech models expect 16kHz)
    pub sample_rate: u32,

    /// Enabled capture kinds
    pub enable_transcript: bool,
    pub enable_keystrokes: bool,
    pub enable_clipboard: bool,
    pub enable_screenshots: bool,

    /// Keep the raw audio as `audio.wav` in the session directory
    pub save_audio: bool,

    /// Key sequence that triggers a screenshot; empty disables the hotkey
    pub hotkey_screenshot: String,

    /// Max time between keys for the hotkey sequence
    pub hotkey_window: Duration,

    /// Word that triggers a screenshot when heard; empty disables
    pub voice_trigger: String,

    /// Phrase that stops the recording when heard; empty disables
    pub voice_stop: String,

    /// Words the transcriber should bias recognition toward
    pub vocabulary_boost: Vec<String>,

    /// Clipboard polling cadence
    pub clipboard_poll_interval: Duration,

    /// Aggregation queue capacity; overflow drops the oldest event
    pub queue_capacity: usize,

    /// Bound on each source's stop call during teardown
    pub source_stop_timeout: Duration,

    /// Bound on the final queue drain after sources have stopped
    pub drain_grace: Duration,

    /// Keystrokes closer together than this coalesce into one sequence
    pub coalesce_gap: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            model: "base".to_string(),
            audio_device: None,
            sample_rate: 16000,
            enable_transcript: true,
            enable_keystrokes: true,
            enable_clipboard: true,
            enable_screenshots: true,
            save_audio: true,
            hotkey_screenshot: "jj".to_string(),
            hotkey_window: Duration::from_millis(500),
            voice_trigger: "marco".to_string(),
            voice_stop: "finito".to_string(),
            vocabulary_boost: Vec::new(),
            clipboard_poll_interval: Duration::from_millis(500),
            queue_capacity: 1024,
            source_stop_timeout: Duration::from_secs(5),
            drain_grace: Duration::from_secs(2),
            coalesce_gap: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be at least 1");
        }
        if !(self.enable_transcript
            || self.enable_keystrokes
            || self.enable_clipboard
            || self.enable_screenshots)
        {
            bail!("no capture sources enabled");
        }
        if !self.hotkey_screenshot.is_empty() && self.hotkey_screenshot.chars().count() < 2 {
            bail!("hotkey sequence needs at least two keys");
        }
        if self.enable_clipboard && self.clipboard_poll_interval.is_zero() {
            bail!("clipboard_poll_interval must be non-zero");
        }
        if self.coalesce_gap.is_zero() {
            bail!("coalesce_gap must be non-zero");
        }
        Ok(())
    }
}

/// `~/.contextrec/sessions`
pub fn default_output_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/.contextrec/sessions").as_ref())
}
