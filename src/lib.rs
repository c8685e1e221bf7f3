pub mod audio;
pub mod capture;
pub mod config;
pub mod event;
pub mod output;
pub mod queue;
pub mod session;
pub mod timeline;

pub use audio::WavSink;
pub use capture::{CaptureHooks, CaptureSource, ControlMessage};
pub use config::FileConfig;
pub use event::{CaptureKind, Event, EventPayload, ScreenshotTrigger, SessionClock};
pub use output::{JsonGenerator, MarkdownGenerator};
pub use queue::EventQueue;
pub use session::{
    FailurePhase, RecordingSession, SessionConfig, SessionContext, SessionReport, SessionState,
    SessionWarning, StopReason, Warnings,
};
pub use timeline::{KeystrokeRun, Timeline, TimelineEntry, TimelineSummary};
