//! Simulated capture collaborators.
//!
//! Scripted implementations of the hook traits, used by the integration
//! tests and by `record --simulate`. They play back a schedule relative
//! to their start instant, over the same channels a real backend would
//! use.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::hooks::{
    AudioCapture, AudioFrame, CapturedFrame, ClipboardReader, KeyPress, KeyboardHook,
    ScreenGrabber, SpeechSegment, Transcriber,
};
use super::CaptureHooks;

/// One scheduled key press.
#[derive(Debug, Clone)]
pub struct ScriptedKey {
    pub at_ms: u64,
    pub key: String,
    pub special: bool,
}

impl ScriptedKey {
    pub fn new(at_ms: u64, key: impl Into<String>, special: bool) -> Self {
        Self {
            at_ms,
            key: key.into(),
            special,
        }
    }
}

/// Keyboard hook playing back a scripted key schedule.
pub struct SimKeyboard {
    script: Vec<ScriptedKey>,
    task: Option<JoinHandle<()>>,
}

impl SimKeyboard {
    pub fn new(script: Vec<ScriptedKey>) -> Self {
        Self { script, task: None }
    }

    /// Script that types `text` one key per `gap_ms`, starting at `start_ms`.
    pub fn typing(text: &str, start_ms: u64, gap_ms: u64) -> Self {
        let script = text
            .chars()
            .enumerate()
            .map(|(i, c)| ScriptedKey::new(start_ms + i as u64 * gap_ms, c.to_string(), false))
            .collect();
        Self::new(script)
    }
}

#[async_trait::async_trait]
impl KeyboardHook for SimKeyboard {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyPress>> {
        let (tx, rx) = mpsc::channel(64);
        let script = std::mem::take(&mut self.script);
        self.task = Some(tokio::spawn(async move {
            let origin = Instant::now();
            for key in script {
                let target = Duration::from_millis(key.at_ms);
                let elapsed = origin.elapsed();
                if target > elapsed {
                    tokio::time::sleep(target - elapsed).await;
                }
                let press = KeyPress {
                    key: key.key,
                    special: key.special,
                };
                if tx.send(press).await.is_err() {
                    break;
                }
            }
        }));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}

/// Keyboard hook that fails to initialize, e.g. a denied OS permission.
pub struct UnavailableKeyboard {
    reason: String,
}

impl UnavailableKeyboard {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl KeyboardHook for UnavailableKeyboard {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyPress>> {
        Err(anyhow!("{}", self.reason))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Clipboard whose content changes on a schedule.
pub struct SimClipboard {
    origin: Instant,
    initial: String,
    changes: Vec<(u64, String)>,
}

impl SimClipboard {
    pub fn new(initial: impl Into<String>, changes: Vec<(u64, String)>) -> Self {
        Self {
            origin: Instant::now(),
            initial: initial.into(),
            changes,
        }
    }
}

#[async_trait::async_trait]
impl ClipboardReader for SimClipboard {
    async fn read(&mut self) -> Result<Option<String>> {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        let current = self
            .changes
            .iter()
            .filter(|(at_ms, _)| *at_ms <= elapsed)
            .last()
            .map(|(_, content)| content.as_str())
            .unwrap_or(self.initial.as_str());
        if current.is_empty() {
            Ok(None)
        } else {
            Ok(Some(current.to_string()))
        }
    }
}

/// Clipboard reader that always errors, for exercising the persistent
/// failure path.
pub struct FailingClipboard;

#[async_trait::async_trait]
impl ClipboardReader for FailingClipboard {
    async fn read(&mut self) -> Result<Option<String>> {
        Err(anyhow!("clipboard unavailable"))
    }
}

/// Screen grabber returning a fixed-size placeholder image.
pub struct SimScreenGrabber {
    width: u32,
    height: u32,
}

impl SimScreenGrabber {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait::async_trait]
impl ScreenGrabber for SimScreenGrabber {
    async fn grab(&mut self) -> Result<CapturedFrame> {
        // PNG signature followed by placeholder payload; real grabbers
        // provide fully encoded image data.
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 64]);
        Ok(CapturedFrame {
            png,
            width: self.width,
            height: self.height,
        })
    }
}

/// Audio capture emitting silent frames at a fixed cadence.
pub struct SimAudioCapture {
    sample_rate: u32,
    channels: u16,
    frame_ms: u64,
    task: Option<JoinHandle<()>>,
}

impl SimAudioCapture {
    pub fn new(sample_rate: u32, channels: u16, frame_ms: u64) -> Self {
        Self {
            sample_rate,
            channels,
            frame_ms,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for SimAudioCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(32);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let frame_ms = self.frame_ms;
        let samples_per_frame = (sample_rate as u64 * frame_ms / 1000) as usize * channels as usize;
        self.task = Some(tokio::spawn(async move {
            let origin = Instant::now();
            loop {
                tokio::time::sleep(Duration::from_millis(frame_ms)).await;
                let frame = AudioFrame {
                    samples: vec![0i16; samples_per_frame],
                    sample_rate,
                    channels,
                    elapsed_ms: origin.elapsed().as_millis() as u64,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}

/// Transcriber playing back scripted segments.
///
/// Timed segments are delivered at their scheduled offset after start,
/// modelling transcription lag. Buffered segments are held until `flush`,
/// modelling speech still being finalized when recording stops; an
/// optional flush delay models a worker that takes time to finalize.
pub struct SimTranscriber {
    timed: Vec<(u64, SpeechSegment)>,
    buffered: Vec<SpeechSegment>,
    flush_delay: Duration,
    tx: Option<mpsc::Sender<SpeechSegment>>,
    task: Option<JoinHandle<()>>,
}

impl SimTranscriber {
    pub fn new(timed: Vec<(u64, SpeechSegment)>, buffered: Vec<SpeechSegment>) -> Self {
        Self {
            timed,
            buffered,
            flush_delay: Duration::ZERO,
            tx: None,
            task: None,
        }
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    pub fn segment(text: &str, confidence: f32, start_ms: u64, end_ms: u64) -> SpeechSegment {
        SpeechSegment {
            text: text.to_string(),
            confidence,
            start_ms,
            end_ms,
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for SimTranscriber {
    async fn start(&mut self) -> Result<mpsc::Receiver<SpeechSegment>> {
        let (tx, rx) = mpsc::channel(32);
        let timed = std::mem::take(&mut self.timed);
        let task_tx = tx.clone();
        self.task = Some(tokio::spawn(async move {
            let origin = Instant::now();
            for (at_ms, segment) in timed {
                let target = Duration::from_millis(at_ms);
                let elapsed = origin.elapsed();
                if target > elapsed {
                    tokio::time::sleep(target - elapsed).await;
                }
                if task_tx.send(segment).await.is_err() {
                    break;
                }
            }
        }));
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn feed(&mut self, _frame: AudioFrame) -> Result<()> {
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.flush_delay.is_zero() {
            tokio::time::sleep(self.flush_delay).await;
        }
        if let Some(tx) = &self.tx {
            for segment in self.buffered.drain(..) {
                if tx.send(segment).await.is_err() {
                    break;
                }
            }
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // Dropping the sender closes the segment stream.
        self.tx = None;
        Ok(())
    }
}

/// Hooks for a short self-contained demo session: typed keys including
/// the screenshot hotkey, a clipboard change, scripted speech with the
/// voice trigger and the voice stop phrase, and one segment that is only
/// finalized at shutdown.
pub fn demo_hooks() -> CaptureHooks {
    let mut keys = vec![
        ScriptedKey::new(300, "h", false),
        ScriptedKey::new(400, "e", false),
        ScriptedKey::new(500, "l", false),
        ScriptedKey::new(600, "l", false),
        ScriptedKey::new(700, "o", false),
        ScriptedKey::new(800, "<enter>", true),
        // screenshot hotkey
        ScriptedKey::new(1500, "j", false),
        ScriptedKey::new(1580, "j", false),
    ];
    for (i, c) in "cargo test".chars().enumerate() {
        keys.push(ScriptedKey::new(2500 + i as u64 * 90, c.to_string(), false));
    }

    let transcriber = SimTranscriber::new(
        vec![
            (
                1200,
                SimTranscriber::segment("let's capture the failing build", 0.92, 600, 1100),
            ),
            (3400, SimTranscriber::segment("marco", 0.88, 3000, 3200)),
            (
                5200,
                SimTranscriber::segment("that should be everything, finito", 0.90, 4600, 5100),
            ),
        ],
        vec![SimTranscriber::segment(
            "one more thought before we wrap up",
            0.85,
            5300,
            5600,
        )],
    );

    CaptureHooks {
        audio: Some(Box::new(SimAudioCapture::new(16000, 1, 100))),
        transcriber: Some(Box::new(transcriber)),
        keyboard: Some(Box::new(SimKeyboard::new(keys))),
        clipboard: Some(Box::new(SimClipboard::new(
            "",
            vec![(2000, "cargo test --all".to_string())],
        ))),
        screen: Some(Box::new(SimScreenGrabber::new(1440, 900))),
    }
}
