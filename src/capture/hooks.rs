//! External capture collaborator interfaces.
//!
//! The engine consumes the OS-level capture primitives and the speech
//! pipeline behind these traits; it never implements them itself. Real
//! platform integrations and the simulated backends in [`super::sim`]
//! plug in through [`super::CaptureHooks`].

use anyhow::Result;
use tokio::sync::mpsc;

/// Raw audio samples (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Milliseconds on the session clock when the frame was captured
    pub elapsed_ms: u64,
}

/// Finalized speech segment produced by a transcriber.
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    pub text: String,
    pub confidence: f32,
    /// Segment bounds on the session clock
    pub start_ms: u64,
    pub end_ms: u64,
}

/// One key press observed by the keyboard hook.
#[derive(Debug, Clone)]
pub struct KeyPress {
    /// Printable symbol, or `<name>` for special keys (e.g. `<enter>`)
    pub key: String,
    pub special: bool,
}

/// One grabbed screen image, already encoded.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// OS audio input. `start` returns the frame stream; the implementation
/// closes it when stopped.
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;
    async fn stop(&mut self) -> Result<()>;
}

/// Background speech-to-text worker. May run arbitrarily behind real
/// time; `flush` finalizes whatever audio is still buffered, and `stop`
/// closes the segment stream once everything buffered has been delivered.
#[async_trait::async_trait]
pub trait Transcriber: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<SpeechSegment>>;
    async fn feed(&mut self, frame: AudioFrame) -> Result<()>;
    async fn flush(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// OS keyboard hook. `start` returns the key-press stream.
#[async_trait::async_trait]
pub trait KeyboardHook: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyPress>>;
    async fn stop(&mut self) -> Result<()>;
}

/// Clipboard text reader, polled by the clipboard source. `Ok(None)`
/// means the clipboard holds no text content right now.
#[async_trait::async_trait]
pub trait ClipboardReader: Send {
    async fn read(&mut self) -> Result<Option<String>>;
}

/// On-demand full-screen grabber.
#[async_trait::async_trait]
pub trait ScreenGrabber: Send {
    async fn grab(&mut self) -> Result<CapturedFrame>;
}
