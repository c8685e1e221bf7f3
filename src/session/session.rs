//! Recording session orchestrator.
//!
//! Owns the whole lifecycle: starts the enabled capture sources, runs the
//! consumer loop that drains the aggregation queue into the timeline,
//! routes cross-source trigger messages, and drives the ordered teardown
//! that freezes the timeline without losing in-flight events.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::capture::{self, CaptureHooks, CaptureSource, ControlMessage, ScreenshotRequest};
use crate::event::{ScreenshotTrigger, SessionClock};
use crate::output::{JsonGenerator, MarkdownGenerator};
use crate::queue::EventQueue;
use crate::timeline::Timeline;

use super::config::SessionConfig;
use super::report::{FailurePhase, SessionReport, SessionWarning, StopReason, Warnings};
use super::state::{SessionState, StateCell};

/// Everything a component needs to know about the session it serves.
/// Passed by `Arc`; there is no ambient global session state.
#[derive(Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    /// Per-session output directory (screenshots, audio, artifacts)
    pub dir: PathBuf,
    pub clock: SessionClock,
    pub config: SessionConfig,
}

pub struct RecordingSession {
    config: SessionConfig,
    hooks: Option<CaptureHooks>,
    state: Arc<StateCell>,
    warnings: Warnings,
    ctx: Option<Arc<SessionContext>>,
    queue: Option<Arc<EventQueue>>,
    /// Live sources in teardown order
    sources: Vec<Box<dyn CaptureSource>>,
    consumer: Option<JoinHandle<Timeline>>,
    dispatch: Option<JoinHandle<()>>,
    control_tx: Option<mpsc::Sender<ControlMessage>>,
    dispatch_stop: Arc<Notify>,
    finalize: Arc<Notify>,
    stop_wait: Arc<Notify>,
    pending_stop: Arc<Mutex<Option<StopReason>>>,
    report: Option<SessionReport>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, hooks: CaptureHooks) -> Self {
        Self {
            config,
            hooks: Some(hooks),
            state: Arc::new(StateCell::new()),
            warnings: Warnings::new(),
            ctx: None,
            queue: None,
            sources: Vec::new(),
            consumer: None,
            dispatch: None,
            control_tx: None,
            dispatch_stop: Arc::new(Notify::new()),
            finalize: Arc::new(Notify::new()),
            stop_wait: Arc::new(Notify::new()),
            pending_stop: Arc::new(Mutex::new(None)),
            report: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn session_dir(&self) -> Option<&Path> {
        self.ctx.as_ref().map(|ctx| ctx.dir.as_path())
    }

    pub fn warnings(&self) -> Vec<SessionWarning> {
        self.warnings.snapshot()
    }

    /// Start the session: create the session directory, start the enabled
    /// sources, spawn the consumer and dispatch tasks. A source that fails
    /// to initialize is excluded with a warning; the session still runs
    /// with the remaining sources.
    pub async fn start(&mut self) -> Result<()> {
        if self.state.get() != SessionState::Idle {
            bail!("session already started");
        }
        self.config.validate()?;

        let clock = SessionClock::start();
        let session_id = format!("session_{}", clock.started_at().format("%Y%m%d_%H%M%S"));
        let dir = self.config.output_dir.join(&session_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session directory {:?}", dir))?;

        info!(session = %session_id, dir = %dir.display(), "starting recording session");

        let ctx = Arc::new(SessionContext {
            session_id,
            started_at: clock.started_at(),
            dir,
            clock,
            config: self.config.clone(),
        });
        let queue = Arc::new(EventQueue::new(ctx.config.queue_capacity));

        let (control_tx, mut control_rx) = mpsc::channel::<ControlMessage>(16);
        let (shot_tx, shot_rx) = mpsc::channel::<ScreenshotRequest>(16);

        // Consumer: the only writer of the timeline. Drains the queue in
        // delivery order while the timeline re-sorts by timestamp. Exits
        // when the queue closes, or on the force-finalize signal.
        let consumer_queue = Arc::clone(&queue);
        let finalize = Arc::clone(&self.finalize);
        self.consumer = Some(tokio::spawn(async move {
            let mut timeline = Timeline::new();
            loop {
                tokio::select! {
                    event = consumer_queue.recv() => match event {
                        Some(event) => {
                            timeline.append(event);
                        }
                        None => break,
                    },
                    _ = finalize.notified() => {
                        debug!("timeline consumer force-finalized");
                        break;
                    }
                }
            }
            while let Some(event) = consumer_queue.try_recv() {
                timeline.append(event);
            }
            timeline.freeze();
            debug!(events = timeline.len(), "timeline consumer stopped");
            timeline
        }));

        // Dispatch: the single routing point for cross-source messages.
        // Screenshot triggers are honored only while Running, so no new
        // capture is initiated once the session starts stopping.
        let state = Arc::clone(&self.state);
        let dispatch_stop = Arc::clone(&self.dispatch_stop);
        let stop_wait = Arc::clone(&self.stop_wait);
        let pending_stop = Arc::clone(&self.pending_stop);
        self.dispatch = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = control_rx.recv() => match msg {
                        Some(ControlMessage::CaptureScreenshot { trigger }) => {
                            if state.get() != SessionState::Running {
                                debug!(%trigger, "ignoring screenshot trigger while not running");
                                continue;
                            }
                            if shot_tx.try_send(ScreenshotRequest { trigger }).is_err() {
                                debug!(%trigger, "screenshot source unavailable, trigger dropped");
                            }
                        }
                        Some(ControlMessage::StopRequested { reason }) => {
                            if state.get() == SessionState::Running {
                                info!(%reason, "stop requested");
                                *pending_stop.lock().unwrap() = Some(reason);
                                stop_wait.notify_one();
                            }
                        }
                        None => break,
                    },
                    _ = dispatch_stop.notified() => break,
                }
            }
            // Dropping shot_tx closes the screenshot request channel.
            debug!("dispatch task stopped");
        }));

        let hooks = self.hooks.take().context("session hooks already consumed")?;
        let sources =
            capture::build_sources(&ctx, &queue, &self.warnings, hooks, &control_tx, shot_rx);

        for mut source in sources {
            let kind = source.kind();
            match source.start().await {
                Ok(()) => {
                    info!(source = %kind, "capture source started");
                    self.sources.push(source);
                }
                Err(e) => {
                    warn!(source = %kind, "capture source failed to initialize: {e:#}");
                    self.warnings
                        .push(SessionWarning::init(kind, format!("{e:#}")));
                }
            }
        }
        if self.sources.is_empty() {
            warn!("no capture sources are live; session will record nothing");
        }

        self.control_tx = Some(control_tx);
        self.ctx = Some(ctx);
        self.queue = Some(queue);
        self.state.set(SessionState::Running);
        info!("recording session running");
        Ok(())
    }

    /// Resolve once an internal stop trigger fires (e.g. the voice stop
    /// phrase). Callers race this against their own stop signal.
    pub async fn wait(&self) -> StopReason {
        loop {
            if let Some(reason) = *self.pending_stop.lock().unwrap() {
                return reason;
            }
            self.stop_wait.notified().await;
        }
    }

    /// Take a screenshot now, as if a hotkey had been pressed.
    pub async fn request_screenshot(&self) -> Result<()> {
        if self.state.get() != SessionState::Running {
            bail!("session is not running");
        }
        let control = self.control_tx.as_ref().context("session is not running")?;
        control
            .send(ControlMessage::CaptureScreenshot {
                trigger: ScreenshotTrigger::Manual,
            })
            .await
            .context("control channel closed")?;
        Ok(())
    }

    /// Stop the session: halt trigger dispatch, stop sources in the fixed
    /// teardown order (each bounded by a timeout, failures collected),
    /// drain the queue within the grace period, freeze the timeline, and
    /// render the output artifacts. Idempotent — a second call returns the
    /// same report.
    pub async fn stop(&mut self, reason: StopReason) -> Result<SessionReport> {
        match self.state.get() {
            SessionState::Stopped => {
                debug!("stop called on stopped session");
                return self
                    .report
                    .clone()
                    .context("session stopped without a report");
            }
            SessionState::Idle => bail!("session was never started"),
            _ => {}
        }
        if self
            .state
            .transition(SessionState::Running, SessionState::Stopping)
        {
            info!(%reason, "stopping recording session");
        }

        let ctx = Arc::clone(self.ctx.as_ref().context("missing session context")?);
        let queue = Arc::clone(self.queue.as_ref().context("missing event queue")?);

        // 1. No new capture initiation: close the control channel and halt
        //    dispatch, which also closes the screenshot request channel.
        self.control_tx = None;
        self.dispatch_stop.notify_one();
        if let Some(handle) = self.dispatch.take() {
            if timeout(ctx.config.source_stop_timeout, handle)
                .await
                .is_err()
            {
                warn!("dispatch task did not stop in time");
            }
        }

        // 2. Stop sources in fixed order, flush-heavy first. Each stop is
        //    isolated: a failure or hang is recorded and the teardown
        //    moves on to the next source.
        for source in self.sources.iter_mut() {
            let kind = source.kind();
            match timeout(ctx.config.source_stop_timeout, source.stop()).await {
                Ok(Ok(())) => info!(source = %kind, "capture source stopped"),
                Ok(Err(e)) => {
                    warn!(source = %kind, "capture source stop failed: {e:#}");
                    self.warnings
                        .push(SessionWarning::teardown(kind, format!("{e:#}")));
                }
                Err(_) => {
                    warn!(source = %kind, "capture source stop timed out");
                    self.warnings.push(SessionWarning::teardown(
                        kind,
                        format!(
                            "stop timed out after {}ms",
                            ctx.config.source_stop_timeout.as_millis()
                        ),
                    ));
                }
            }
        }
        self.sources.clear();

        // 3. Final drain: close the queue so the consumer sees end of
        //    stream, bounded by the grace period; past it, force-finalize
        //    with whatever the timeline holds.
        queue.close();
        let timeline = match self.consumer.take() {
            Some(mut handle) => match timeout(ctx.config.drain_grace, &mut handle).await {
                Ok(Ok(timeline)) => timeline,
                Ok(Err(e)) => {
                    error!("timeline consumer failed: {e}");
                    self.warnings.push(SessionWarning::session(
                        FailurePhase::Fatal,
                        format!("timeline consumer failed: {e}"),
                    ));
                    frozen_empty()
                }
                Err(_) => {
                    warn!("drain grace period expired, force-finalizing timeline");
                    self.finalize.notify_one();
                    match timeout(ctx.config.drain_grace, &mut handle).await {
                        Ok(Ok(timeline)) => timeline,
                        _ => {
                            self.warnings.push(SessionWarning::session(
                                FailurePhase::Fatal,
                                "timeline consumer unresponsive, captured events lost",
                            ));
                            frozen_empty()
                        }
                    }
                }
            },
            None => frozen_empty(),
        };

        let events_dropped = queue.dropped();
        if events_dropped > 0 {
            self.warnings.push(SessionWarning::session(
                FailurePhase::Runtime,
                format!("{events_dropped} events dropped under queue overflow"),
            ));
        }

        self.state.set(SessionState::Stopped);
        let ended_at = Utc::now();
        let duration_ms = (ended_at - ctx.started_at).num_milliseconds().max(0) as u64;
        info!(
            session = %ctx.session_id,
            duration_ms,
            events = timeline.len(),
            "recording session stopped"
        );

        // 4. Output artifacts, best-effort: a failed render is a warning,
        //    never a lost session.
        let rendered_warnings = self.warnings.snapshot();
        let md_path = ctx.dir.join("recording.md");
        if let Err(e) =
            MarkdownGenerator::new(&ctx, &timeline, &rendered_warnings, ended_at).save(&md_path)
        {
            error!("markdown output failed: {e:#}");
            self.warnings.push(SessionWarning::session(
                FailurePhase::Teardown,
                format!("markdown output failed: {e:#}"),
            ));
        } else {
            info!(path = %md_path.display(), "markdown saved");
        }
        let json_path = ctx.dir.join("recording.json");
        if let Err(e) = JsonGenerator::new(
            &ctx,
            &timeline,
            &rendered_warnings,
            ended_at,
            reason,
            events_dropped,
        )
        .save(&json_path)
        {
            error!("JSON output failed: {e:#}");
            self.warnings.push(SessionWarning::session(
                FailurePhase::Teardown,
                format!("JSON output failed: {e:#}"),
            ));
        } else {
            info!(path = %json_path.display(), "JSON saved");
        }

        let report = SessionReport {
            session_id: ctx.session_id.clone(),
            session_dir: ctx.dir.clone(),
            started_at: ctx.started_at,
            ended_at,
            duration_ms,
            stop_reason: reason,
            summary: timeline.summary(ctx.config.coalesce_gap.as_millis() as u64),
            warnings: self.warnings.snapshot(),
            events_dropped,
            timeline,
        };
        self.report = Some(report.clone());
        Ok(report)
    }
}

fn frozen_empty() -> Timeline {
    let mut timeline = Timeline::new();
    timeline.freeze();
    timeline
}
