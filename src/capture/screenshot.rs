//! Screenshot capture source.
//!
//! Serves on-demand requests routed through the orchestrator (hotkey,
//! voice trigger, or explicit API call). Each request grabs a frame,
//! persists it under the session directory named by its millisecond
//! offset, and emits a Screenshot event referencing the file.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::event::{CaptureKind, Event};
use crate::queue::EventQueue;
use crate::session::{SessionContext, SessionWarning, Warnings};

use super::hooks::ScreenGrabber;
use super::{CaptureSource, ScreenshotRequest};

pub struct ScreenshotSource {
    ctx: Arc<SessionContext>,
    queue: Arc<EventQueue>,
    warnings: Warnings,
    screen: Option<Box<dyn ScreenGrabber>>,
    requests: Option<mpsc::Receiver<ScreenshotRequest>>,
    task: Option<JoinHandle<()>>,
}

impl ScreenshotSource {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<EventQueue>,
        warnings: Warnings,
        screen: Box<dyn ScreenGrabber>,
        requests: mpsc::Receiver<ScreenshotRequest>,
    ) -> Self {
        Self {
            ctx,
            queue,
            warnings,
            screen: Some(screen),
            requests: Some(requests),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for ScreenshotSource {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Screenshot
    }

    fn name(&self) -> &str {
        "screenshot"
    }

    async fn start(&mut self) -> Result<()> {
        let mut screen = self
            .screen
            .take()
            .context("screenshot source already started")?;
        let mut requests = self
            .requests
            .take()
            .context("screenshot request channel already consumed")?;

        let clock = self.ctx.clock.clone();
        let dir = self.ctx.dir.clone();
        let queue = Arc::clone(&self.queue);
        let warnings = self.warnings.clone();

        self.task = Some(tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                let ts = clock.elapsed_ms();
                let frame = match screen.grab().await {
                    Ok(frame) => frame,
                    Err(e) => {
                        warnings.push(SessionWarning::runtime(
                            CaptureKind::Screenshot,
                            format!("screen grab failed: {e:#}"),
                        ));
                        continue;
                    }
                };
                let filename = format!("img_{ts:06}.png");
                let path = dir.join(&filename);
                if let Err(e) = tokio::fs::write(&path, &frame.png).await {
                    warnings.push(SessionWarning::runtime(
                        CaptureKind::Screenshot,
                        format!("failed to persist screenshot {filename}: {e}"),
                    ));
                    continue;
                }
                info!(%filename, trigger = %request.trigger, "screenshot captured");
                if let Some(event) =
                    Event::screenshot(ts, filename, frame.width, frame.height, request.trigger)
                {
                    queue.publish(event);
                }
            }
            debug!("screenshot task stopped");
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // The request channel closes when dispatch stops routing; the
        // task then exits on its own after serving pending requests.
        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                self.warnings.push(SessionWarning::teardown(
                    CaptureKind::Screenshot,
                    format!("screenshot task failed: {e}"),
                ));
            }
        }
        Ok(())
    }
}
