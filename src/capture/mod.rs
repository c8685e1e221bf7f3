//! Capture sources: independent producers feeding the aggregation queue.
//!
//! Each modality is a [`CaptureSource`] running its own tasks. Sources
//! never talk to each other directly — cross-source triggers (hotkey or
//! voice driven screenshots, voice stop) travel as [`ControlMessage`]s to
//! the orchestrator's dispatch point.

pub mod clipboard;
pub mod hooks;
pub mod keystroke;
pub mod screenshot;
pub mod sim;
pub mod transcript;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::event::{CaptureKind, ScreenshotTrigger};
use crate::queue::EventQueue;
use crate::session::{SessionContext, SessionWarning, StopReason, Warnings};

use clipboard::ClipboardSource;
use hooks::{AudioCapture, ClipboardReader, KeyboardHook, ScreenGrabber, Transcriber};
use keystroke::KeystrokeSource;
use screenshot::ScreenshotSource;
use transcript::TranscriptSource;

/// A polymorphic capture producer. `start` spawns the source's worker
/// tasks; `stop` signals and awaits them. Sources report failures through
/// the shared warning sink, never by panicking or erroring into the
/// consumer.
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    fn kind(&self) -> CaptureKind;
    fn name(&self) -> &str;
    async fn start(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// Cross-source message routed through the orchestrator.
#[derive(Debug, Clone, Copy)]
pub enum ControlMessage {
    CaptureScreenshot { trigger: ScreenshotTrigger },
    StopRequested { reason: StopReason },
}

/// Request served by the screenshot source.
#[derive(Debug, Clone, Copy)]
pub struct ScreenshotRequest {
    pub trigger: ScreenshotTrigger,
}

/// External collaborator implementations injected into a session.
/// Only the hooks for enabled capture kinds are consulted.
#[derive(Default)]
pub struct CaptureHooks {
    pub audio: Option<Box<dyn AudioCapture>>,
    pub transcriber: Option<Box<dyn Transcriber>>,
    pub keyboard: Option<Box<dyn KeyboardHook>>,
    pub clipboard: Option<Box<dyn ClipboardReader>>,
    pub screen: Option<Box<dyn ScreenGrabber>>,
}

/// Instantiate the sources enabled in the session config, in the fixed
/// teardown order: transcript first (its collaborator buffers behind real
/// time and needs the flush window), screenshot last (it only serves
/// requests that dispatch stops routing first). An enabled kind with no
/// backend hook is excluded with an init warning.
pub(crate) fn build_sources(
    ctx: &Arc<SessionContext>,
    queue: &Arc<EventQueue>,
    warnings: &Warnings,
    hooks: CaptureHooks,
    control_tx: &mpsc::Sender<ControlMessage>,
    shot_rx: mpsc::Receiver<ScreenshotRequest>,
) -> Vec<Box<dyn CaptureSource>> {
    let cfg = &ctx.config;
    let mut sources: Vec<Box<dyn CaptureSource>> = Vec::new();

    if cfg.enable_transcript {
        match (hooks.audio, hooks.transcriber) {
            (Some(audio), Some(transcriber)) => sources.push(Box::new(TranscriptSource::new(
                Arc::clone(ctx),
                Arc::clone(queue),
                warnings.clone(),
                control_tx.clone(),
                audio,
                transcriber,
            ))),
            _ => warnings.push(SessionWarning::init(
                CaptureKind::Transcript,
                "no audio capture / transcriber backend available",
            )),
        }
    }

    if cfg.enable_keystrokes {
        match hooks.keyboard {
            Some(keyboard) => sources.push(Box::new(KeystrokeSource::new(
                Arc::clone(ctx),
                Arc::clone(queue),
                warnings.clone(),
                control_tx.clone(),
                keyboard,
            ))),
            None => warnings.push(SessionWarning::init(
                CaptureKind::Keystroke,
                "no keyboard hook backend available",
            )),
        }
    }

    if cfg.enable_clipboard {
        match hooks.clipboard {
            Some(reader) => sources.push(Box::new(ClipboardSource::new(
                Arc::clone(ctx),
                Arc::clone(queue),
                warnings.clone(),
                reader,
            ))),
            None => warnings.push(SessionWarning::init(
                CaptureKind::Clipboard,
                "no clipboard reader backend available",
            )),
        }
    }

    if cfg.enable_screenshots {
        match hooks.screen {
            Some(screen) => sources.push(Box::new(ScreenshotSource::new(
                Arc::clone(ctx),
                Arc::clone(queue),
                warnings.clone(),
                screen,
                shot_rx,
            ))),
            None => warnings.push(SessionWarning::init(
                CaptureKind::Screenshot,
                "no screen grabber backend available",
            )),
        }
    }

    sources
}
