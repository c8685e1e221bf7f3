//! Keystroke capture source with hotkey detection.
//!
//! Emits one Keystroke event per key press. A configurable two-key
//! sequence typed within a short window (default `jj` in 500ms) is a
//! side channel: it requests a screenshot through the orchestrator
//! instead of being logged, and the completing key is suppressed.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::event::{CaptureKind, Event, ScreenshotTrigger};
use crate::queue::EventQueue;
use crate::session::{SessionContext, SessionWarning, Warnings};

use super::hooks::KeyboardHook;
use super::{CaptureSource, ControlMessage};

pub struct KeystrokeSource {
    ctx: Arc<SessionContext>,
    queue: Arc<EventQueue>,
    warnings: Warnings,
    control: mpsc::Sender<ControlMessage>,
    hook: Box<dyn KeyboardHook>,
    task: Option<JoinHandle<()>>,
}

impl KeystrokeSource {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<EventQueue>,
        warnings: Warnings,
        control: mpsc::Sender<ControlMessage>,
        hook: Box<dyn KeyboardHook>,
    ) -> Self {
        Self {
            ctx,
            queue,
            warnings,
            control,
            hook,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for KeystrokeSource {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Keystroke
    }

    fn name(&self) -> &str {
        "keystroke"
    }

    async fn start(&mut self) -> Result<()> {
        let mut rx = self
            .hook
            .start()
            .await
            .context("failed to start keyboard hook")?;

        let clock = self.ctx.clock.clone();
        let queue = Arc::clone(&self.queue);
        let control = self.control.clone();
        let mut detector = if self.ctx.config.hotkey_screenshot.is_empty() {
            None
        } else {
            Some(HotkeyDetector::new(
                &self.ctx.config.hotkey_screenshot,
                self.ctx.config.hotkey_window.as_millis() as u64,
            ))
        };

        self.task = Some(tokio::spawn(async move {
            let mut total = 0u64;
            while let Some(press) = rx.recv().await {
                let ts = clock.elapsed_ms();
                total += 1;
                if !press.special {
                    if let Some(detector) = detector.as_mut() {
                        if detector.observe(&press.key, ts) {
                            info!("screenshot hotkey detected");
                            if control
                                .try_send(ControlMessage::CaptureScreenshot {
                                    trigger: ScreenshotTrigger::Hotkey,
                                })
                                .is_err()
                            {
                                debug!("control channel unavailable, hotkey dropped");
                            }
                            // The completing key belongs to the hotkey,
                            // not to the typed record.
                            continue;
                        }
                    }
                }
                if let Some(event) = Event::keystroke(ts, press.key, press.special) {
                    queue.publish(event);
                }
            }
            debug!(total, "keystroke task stopped");
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.hook.stop().await {
            self.warnings.push(SessionWarning::teardown(
                CaptureKind::Keystroke,
                format!("keyboard hook stop failed: {e:#}"),
            ));
        }
        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                self.warnings.push(SessionWarning::teardown(
                    CaptureKind::Keystroke,
                    format!("keystroke task failed: {e}"),
                ));
            }
        }
        Ok(())
    }
}

/// Recognizes a key sequence typed within a time window. Only non-special
/// keys participate; the buffer is cleared after a match so the sequence
/// cannot retrigger from its own tail.
struct HotkeyDetector {
    sequence: String,
    window_ms: u64,
    buffer: Vec<(String, u64)>,
}

impl HotkeyDetector {
    fn new(sequence: &str, window_ms: u64) -> Self {
        Self {
            sequence: sequence.to_string(),
            window_ms,
            buffer: Vec::new(),
        }
    }

    fn observe(&mut self, key: &str, at_ms: u64) -> bool {
        self.buffer
            .retain(|(_, t)| at_ms.saturating_sub(*t) < self.window_ms);
        self.buffer.push((key.to_string(), at_ms));

        let needed = self.sequence.chars().count();
        if self.buffer.len() >= needed {
            let tail: String = self.buffer[self.buffer.len() - needed..]
                .iter()
                .map(|(k, _)| k.as_str())
                .collect();
            if tail == self.sequence {
                self.buffer.clear();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_within_window_matches() {
        let mut detector = HotkeyDetector::new("jj", 500);
        assert!(!detector.observe("j", 100));
        assert!(detector.observe("j", 300));
    }

    #[test]
    fn sequence_outside_window_does_not_match() {
        let mut detector = HotkeyDetector::new("jj", 500);
        assert!(!detector.observe("j", 100));
        assert!(!detector.observe("j", 700));
        // the second j is still fresh, a third within the window completes
        assert!(detector.observe("j", 900));
    }

    #[test]
    fn interleaved_keys_break_the_sequence() {
        let mut detector = HotkeyDetector::new("jj", 500);
        assert!(!detector.observe("j", 100));
        assert!(!detector.observe("x", 150));
        assert!(!detector.observe("j", 200));
    }

    #[test]
    fn buffer_clears_after_match() {
        let mut detector = HotkeyDetector::new("jj", 500);
        assert!(!detector.observe("j", 100));
        assert!(detector.observe("j", 200));
        // a single j right after must not retrigger
        assert!(!detector.observe("j", 300));
    }
}
