//! Event model: immutable, typed records of captured occurrences.
//!
//! Every event carries a timestamp in milliseconds on the session's
//! monotonic clock, assigned at the moment the source observed the
//! occurrence. Construction goes through the per-kind factories, which
//! validate payload shape; there is no way to mutate an event afterwards.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The four capture modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Transcript,
    Keystroke,
    Clipboard,
    Screenshot,
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureKind::Transcript => write!(f, "transcript"),
            CaptureKind::Keystroke => write!(f, "keystroke"),
            CaptureKind::Clipboard => write!(f, "clipboard"),
            CaptureKind::Screenshot => write!(f, "screenshot"),
        }
    }
}

/// What caused a screenshot to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotTrigger {
    /// Two-key hotkey sequence typed on the keyboard
    Hotkey,
    /// Voice trigger word heard in a finalized transcript segment
    Voice,
    /// Explicit request through the session API
    Manual,
}

impl fmt::Display for ScreenshotTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenshotTrigger::Hotkey => write!(f, "hotkey"),
            ScreenshotTrigger::Voice => write!(f, "voice"),
            ScreenshotTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// Kind-specific event data.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Finalized speech segment with its bounds on the session clock
    Transcript {
        text: String,
        confidence: f32,
        start_ms: u64,
        end_ms: u64,
    },
    /// One key symbol; special keys use the `<name>` form (e.g. `<enter>`)
    Keystroke { key: String, special: bool },
    /// Text snapshot taken when clipboard content changed
    Clipboard { content: String },
    /// File reference (relative to the session directory) plus image size
    Screenshot {
        filename: String,
        width: u32,
        height: u32,
        trigger: ScreenshotTrigger,
    },
}

/// One captured occurrence. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: CaptureKind,
    timestamp_ms: u64,
    #[serde(rename = "data")]
    payload: EventPayload,
}

impl Event {
    /// Wrap a finalized speech segment. The event timestamp is the segment
    /// start, i.e. when the speech happened, not when transcription caught
    /// up. Returns `None` for empty text; such segments are dropped.
    pub fn transcript(
        start_ms: u64,
        end_ms: u64,
        text: impl Into<String>,
        confidence: f32,
    ) -> Option<Event> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Event {
            kind: CaptureKind::Transcript,
            timestamp_ms: start_ms,
            payload: EventPayload::Transcript {
                text,
                confidence,
                start_ms,
                end_ms: end_ms.max(start_ms),
            },
        })
    }

    /// Wrap a single key press. Returns `None` for an empty key symbol.
    pub fn keystroke(timestamp_ms: u64, key: impl Into<String>, special: bool) -> Option<Event> {
        let key = key.into();
        if key.is_empty() {
            return None;
        }
        Some(Event {
            kind: CaptureKind::Keystroke,
            timestamp_ms,
            payload: EventPayload::Keystroke { key, special },
        })
    }

    /// Wrap a clipboard change. Returns `None` for empty content.
    pub fn clipboard(timestamp_ms: u64, content: impl Into<String>) -> Option<Event> {
        let content = content.into();
        if content.is_empty() {
            return None;
        }
        Some(Event {
            kind: CaptureKind::Clipboard,
            timestamp_ms,
            payload: EventPayload::Clipboard { content },
        })
    }

    /// Wrap a captured screenshot. The file must already be persisted;
    /// `filename` is its name inside the session directory. Returns `None`
    /// for an empty filename.
    pub fn screenshot(
        timestamp_ms: u64,
        filename: impl Into<String>,
        width: u32,
        height: u32,
        trigger: ScreenshotTrigger,
    ) -> Option<Event> {
        let filename = filename.into();
        if filename.is_empty() {
            return None;
        }
        Some(Event {
            kind: CaptureKind::Screenshot,
            timestamp_ms,
            payload: EventPayload::Screenshot {
                filename,
                width,
                height,
                trigger,
            },
        })
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

/// Monotonic clock anchored at session start.
///
/// Event timestamps are milliseconds on this clock, so wall-clock
/// adjustments during a session cannot skew event ordering. The wall-clock
/// anchor is kept alongside for converting to absolute time in outputs.
#[derive(Debug, Clone)]
pub struct SessionClock {
    origin: Instant,
    started_at: DateTime<Utc>,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Milliseconds elapsed since the session started.
    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
