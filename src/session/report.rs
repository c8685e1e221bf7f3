use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::CaptureKind;
use crate::timeline::{Timeline, TimelineSummary};

/// Where in the source lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    Init,
    Runtime,
    Teardown,
    Fatal,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePhase::Init => write!(f, "init"),
            FailurePhase::Runtime => write!(f, "runtime"),
            FailurePhase::Teardown => write!(f, "teardown"),
            FailurePhase::Fatal => write!(f, "fatal"),
        }
    }
}

/// A non-fatal problem recorded alongside the session. Capture failures
/// never propagate as errors into the consumer or orchestrator; they
/// become warnings.
#[derive(Debug, Clone, Serialize)]
pub struct SessionWarning {
    pub source: Option<CaptureKind>,
    pub phase: FailurePhase,
    pub message: String,
}

impl SessionWarning {
    pub fn init(source: CaptureKind, message: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            phase: FailurePhase::Init,
            message: message.into(),
        }
    }

    pub fn runtime(source: CaptureKind, message: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            phase: FailurePhase::Runtime,
            message: message.into(),
        }
    }

    pub fn teardown(source: CaptureKind, message: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            phase: FailurePhase::Teardown,
            message: message.into(),
        }
    }

    pub fn session(phase: FailurePhase, message: impl Into<String>) -> Self {
        Self {
            source: None,
            phase,
            message: message.into(),
        }
    }
}

/// Shared warning sink handed to every source.
#[derive(Debug, Clone, Default)]
pub struct Warnings(Arc<Mutex<Vec<SessionWarning>>>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, warning: SessionWarning) {
        self.0.lock().unwrap().push(warning);
    }

    pub fn snapshot(&self) -> Vec<SessionWarning> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// User interrupt (Ctrl+C)
    Interrupt,
    /// Voice stop phrase heard in the transcript
    VoiceCommand,
    /// Explicit stop through the session API
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupt => write!(f, "interrupt"),
            StopReason::VoiceCommand => write!(f, "voice_command"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

/// Final state of a stopped session: the frozen timeline plus metadata.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub session_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock session length
    pub duration_ms: u64,
    pub stop_reason: StopReason,
    pub summary: TimelineSummary,
    pub warnings: Vec<SessionWarning>,
    /// Events lost to aggregation-queue overflow
    pub events_dropped: u64,
    pub timeline: Timeline,
}
