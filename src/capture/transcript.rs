//! Transcript capture source.
//!
//! Owns the audio capture and the background transcription worker. An
//! audio pump task forwards frames to the transcriber (and optionally to
//! the raw WAV artifact); a segment task wraps finalized speech segments
//! into Transcript events. On stop the transcriber is flushed so a
//! segment still buffered behind real time is delivered, not discarded.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::WavSink;
use crate::event::{CaptureKind, Event, ScreenshotTrigger};
use crate::queue::EventQueue;
use crate::session::{SessionContext, SessionWarning, StopReason, Warnings};

use super::hooks::{AudioCapture, Transcriber};
use super::{CaptureSource, ControlMessage};

pub struct TranscriptSource {
    ctx: Arc<SessionContext>,
    queue: Arc<EventQueue>,
    warnings: Warnings,
    control: mpsc::Sender<ControlMessage>,
    audio: Box<dyn AudioCapture>,
    transcriber: Option<Box<dyn Transcriber>>,
    pump: Option<JoinHandle<()>>,
    segments: Option<JoinHandle<()>>,
}

impl TranscriptSource {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<EventQueue>,
        warnings: Warnings,
        control: mpsc::Sender<ControlMessage>,
        audio: Box<dyn AudioCapture>,
        transcriber: Box<dyn Transcriber>,
    ) -> Self {
        Self {
            ctx,
            queue,
            warnings,
            control,
            audio,
            transcriber: Some(transcriber),
            pump: None,
            segments: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for TranscriptSource {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Transcript
    }

    fn name(&self) -> &str {
        "transcript"
    }

    async fn start(&mut self) -> Result<()> {
        let mut audio_rx = self
            .audio
            .start()
            .await
            .context("failed to start audio capture")?;

        let mut transcriber = self
            .transcriber
            .take()
            .context("transcript source already started")?;

        let mut seg_rx = match transcriber.start().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(stop_err) = self.audio.stop().await {
                    warn!("failed to stop audio capture after transcriber error: {stop_err:#}");
                }
                return Err(e).context("failed to start transcriber");
            }
        };

        // Audio pump: frames -> transcriber, plus the optional WAV artifact.
        // The WAV spec comes from the first frame, not the config, in case
        // the backend delivers a different rate than requested.
        let mut save_audio = self.ctx.config.save_audio;
        let wav_path = self.ctx.dir.join("audio.wav");
        let pump_warnings = self.warnings.clone();
        self.pump = Some(tokio::spawn(async move {
            let mut sink: Option<WavSink> = None;
            while let Some(frame) = audio_rx.recv().await {
                if save_audio {
                    if sink.is_none() {
                        match WavSink::create(&wav_path, frame.sample_rate, frame.channels) {
                            Ok(s) => sink = Some(s),
                            Err(e) => {
                                pump_warnings.push(SessionWarning::runtime(
                                    CaptureKind::Transcript,
                                    format!("audio artifact disabled: {e:#}"),
                                ));
                                save_audio = false;
                            }
                        }
                    }
                    if let Some(s) = sink.as_mut() {
                        if let Err(e) = s.write_frame(&frame) {
                            warn!("dropping audio frame from artifact: {e:#}");
                        }
                    }
                }
                if let Err(e) = transcriber.feed(frame).await {
                    pump_warnings.push(SessionWarning::runtime(
                        CaptureKind::Transcript,
                        format!("transcriber rejected audio: {e:#}"),
                    ));
                    break;
                }
            }
            // Audio stream ended: finalize buffered speech before the
            // segment channel closes.
            if let Err(e) = transcriber.flush().await {
                pump_warnings.push(SessionWarning::teardown(
                    CaptureKind::Transcript,
                    format!("transcriber flush failed: {e:#}"),
                ));
            }
            if let Err(e) = transcriber.stop().await {
                pump_warnings.push(SessionWarning::teardown(
                    CaptureKind::Transcript,
                    format!("transcriber stop failed: {e:#}"),
                ));
            }
            if let Some(s) = sink {
                if let Err(e) = s.finalize() {
                    warn!("failed to finalize audio artifact: {e:#}");
                }
            }
            debug!("audio pump task stopped");
        }));

        // Segment task: finalized segments -> Transcript events, plus the
        // voice trigger word and voice stop phrase.
        let queue = Arc::clone(&self.queue);
        let control = self.control.clone();
        let voice_trigger = self.ctx.config.voice_trigger.to_lowercase();
        let voice_stop = self.ctx.config.voice_stop.clone();
        self.segments = Some(tokio::spawn(async move {
            while let Some(seg) = seg_rx.recv().await {
                match Event::transcript(seg.start_ms, seg.end_ms, seg.text.clone(), seg.confidence)
                {
                    Some(event) => {
                        queue.publish(event);
                    }
                    None => debug!("dropping empty transcript segment"),
                }
                if !voice_trigger.is_empty() && seg.text.to_lowercase().contains(&voice_trigger) {
                    info!(word = %voice_trigger, "voice trigger heard, requesting screenshot");
                    if control
                        .try_send(ControlMessage::CaptureScreenshot {
                            trigger: ScreenshotTrigger::Voice,
                        })
                        .is_err()
                    {
                        debug!("control channel unavailable, voice trigger dropped");
                    }
                }
                if !voice_stop.is_empty() && sounds_like(&seg.text, &voice_stop, 2) {
                    info!(phrase = %voice_stop, "voice stop phrase heard");
                    if control
                        .try_send(ControlMessage::StopRequested {
                            reason: StopReason::VoiceCommand,
                        })
                        .is_err()
                    {
                        debug!("control channel unavailable, voice stop dropped");
                    }
                }
            }
            debug!("transcript segment task stopped");
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.audio.stop().await {
            self.warnings.push(SessionWarning::teardown(
                CaptureKind::Transcript,
                format!("audio capture stop failed: {e:#}"),
            ));
        }
        if let Some(handle) = self.pump.take() {
            if let Err(e) = handle.await {
                self.warnings.push(SessionWarning::teardown(
                    CaptureKind::Transcript,
                    format!("audio pump task failed: {e}"),
                ));
            }
        }
        if let Some(handle) = self.segments.take() {
            if let Err(e) = handle.await {
                self.warnings.push(SessionWarning::teardown(
                    CaptureKind::Transcript,
                    format!("segment task failed: {e}"),
                ));
            }
        }
        Ok(())
    }
}

/// Whether any word in `text` is within `max_edits` edits of `target`.
/// Speech models often mistranscribe command words phonetically
/// ("finito" -> "Pinito", "Veneto"), so an exact match is not enough.
pub(crate) fn sounds_like(text: &str, target: &str, max_edits: usize) -> bool {
    let target = target.to_lowercase();
    let target_len = target.chars().count();
    for word in text.to_lowercase().split_whitespace() {
        let word = word.trim_matches(|c: char| ".,!?;:'\"".contains(c));
        if word.chars().count().abs_diff(target_len) > max_edits {
            continue;
        }
        if edit_distance(word, &target) <= max_edits {
            return true;
        }
    }
    false
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (longer, shorter) = if a_chars.len() >= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };
    if shorter.is_empty() {
        return longer.len();
    }
    let mut prev: Vec<usize> = (0..=shorter.len()).collect();
    for (i, &cl) in longer.iter().enumerate() {
        let mut curr = vec![i + 1];
        for (j, &cs) in shorter.iter().enumerate() {
            let insertions = prev[j + 1] + 1;
            let deletions = curr[j] + 1;
            let substitutions = prev[j] + usize::from(cl != cs);
            curr.push(insertions.min(deletions).min(substitutions));
        }
        prev = curr;
    }
    prev[shorter.len()]
}
