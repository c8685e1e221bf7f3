//! Clipboard capture source.
//!
//! Polls the clipboard at a fixed interval and emits an event only when
//! content differs from the last observed value (edge-triggered). The
//! initial content is primed at start so pre-existing clipboard data
//! never produces an event.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::event::{CaptureKind, Event};
use crate::queue::EventQueue;
use crate::session::{SessionContext, SessionWarning, Warnings};

use super::hooks::ClipboardReader;
use super::CaptureSource;

/// Consecutive read failures tolerated before the source gives up.
/// Transient errors are normal (the clipboard may be locked by another
/// application); a persistent streak means the reader is gone.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

pub struct ClipboardSource {
    ctx: Arc<SessionContext>,
    queue: Arc<EventQueue>,
    warnings: Warnings,
    reader: Option<Box<dyn ClipboardReader>>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl ClipboardSource {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<EventQueue>,
        warnings: Warnings,
        reader: Box<dyn ClipboardReader>,
    ) -> Self {
        Self {
            ctx,
            queue,
            warnings,
            reader: Some(reader),
            shutdown: None,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for ClipboardSource {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Clipboard
    }

    fn name(&self) -> &str {
        "clipboard"
    }

    async fn start(&mut self) -> Result<()> {
        let mut reader = self
            .reader
            .take()
            .context("clipboard source already started")?;

        // Prime with whatever is on the clipboard now.
        let mut last = match reader.read().await {
            Ok(content) => content.unwrap_or_default(),
            Err(_) => String::new(),
        };

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let clock = self.ctx.clock.clone();
        let queue = Arc::clone(&self.queue);
        let warnings = self.warnings.clone();
        let mut poll = tokio::time::interval(self.ctx.config.clipboard_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.task = Some(tokio::spawn(async move {
            let mut failures = 0u32;
            loop {
                tokio::select! {
                    _ = poll.tick() => {
                        match reader.read().await {
                            Ok(Some(content)) => {
                                failures = 0;
                                if !content.is_empty() && content != last {
                                    let ts = clock.elapsed_ms();
                                    last = content.clone();
                                    if let Some(event) = Event::clipboard(ts, content) {
                                        queue.publish(event);
                                    }
                                }
                            }
                            Ok(None) => {
                                failures = 0;
                            }
                            Err(e) => {
                                failures += 1;
                                debug!(failures, "clipboard read failed: {e:#}");
                                if failures >= MAX_CONSECUTIVE_FAILURES {
                                    warnings.push(SessionWarning::runtime(
                                        CaptureKind::Clipboard,
                                        format!("clipboard reader failing persistently: {e:#}"),
                                    ));
                                    break;
                                }
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("clipboard task stopped");
        }));

        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                self.warnings.push(SessionWarning::teardown(
                    CaptureKind::Clipboard,
                    format!("clipboard task failed: {e}"),
                ));
            }
        }
        Ok(())
    }
}
