//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Lifecycle of the enabled capture sources
//! - The consumer loop draining the aggregation queue into the timeline
//! - Cross-source trigger dispatch (hotkey / voice screenshot, voice stop)
//! - Ordered, loss-free teardown and output generation

mod config;
mod report;
mod session;
mod state;

pub use config::{default_output_dir, SessionConfig};
pub use report::{FailurePhase, SessionReport, SessionWarning, StopReason, Warnings};
pub use session::{RecordingSession, SessionContext};
pub use state::SessionState;
