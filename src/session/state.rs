//! Session lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Idle -> Running -> Stopping -> Stopped, Stopped terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> SessionState {
        match value {
            1 => SessionState::Running,
            2 => SessionState::Stopping,
            3 => SessionState::Stopped,
            _ => SessionState::Idle,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Atomic holder shared between the orchestrator and its tasks.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(SessionState::Idle as u8))
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Compare-and-swap transition; `false` when the current state was
    /// not `from` (e.g. a second stop signal).
    pub fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
