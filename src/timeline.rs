//! Timeline: ordered accumulation of accepted events.
//!
//! Events from different sources arrive out of timestamp order because
//! pipeline latencies differ (transcription in particular lags real time),
//! so `append` inserts into sorted position rather than pushing. Once an
//! event is in, it is never removed or reordered; `freeze` makes the whole
//! store read-only. Keystroke coalescing is a read-time derivation and
//! never touches the stored events.

use serde::Serialize;
use tracing::debug;

use crate::event::{Event, EventPayload};

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<Event>,
    frozen: bool,
}

/// Consecutive keystrokes merged for display.
#[derive(Debug, Clone, Serialize)]
pub struct KeystrokeRun {
    pub start_ms: u64,
    pub end_ms: u64,
    pub keys: Vec<String>,
    /// Keys joined in order; special keys keep their `<name>` form
    pub text: String,
}

/// One entry of the coalesced timeline view.
#[derive(Debug)]
pub enum TimelineEntry<'a> {
    Event(&'a Event),
    Keystrokes(KeystrokeRun),
}

/// Per-kind counts and duration, computed in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelineSummary {
    pub duration_ms: u64,
    pub total_events: usize,
    pub transcripts: usize,
    pub keystrokes: usize,
    pub clipboard_changes: usize,
    pub screenshots: usize,
    /// Coalesced keystroke sequences (see `keystroke_runs`)
    pub keystroke_runs: usize,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event preserving timestamp order, ties broken
    /// first-accepted-wins. The reverse scan from the tail keeps the
    /// common in-order append O(1) while still placing late-delivered
    /// events correctly. Returns `false` (and changes nothing) once the
    /// timeline is frozen.
    pub fn append(&mut self, event: Event) -> bool {
        if self.frozen {
            debug!("append on frozen timeline ignored");
            return false;
        }
        let ts = event.timestamp_ms();
        let idx = self
            .events
            .iter()
            .rposition(|e| e.timestamp_ms() <= ts)
            .map_or(0, |i| i + 1);
        self.events.insert(idx, event);
        true
    }

    /// Make the timeline read-only. Idempotent; this is the formal
    /// ownership hand-off point to output generation.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stored events in timestamp order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Timestamp of the last event, or 0 for an empty timeline.
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.timestamp_ms())
    }

    /// One-pass summary: per-kind counts, coalesced keystroke-run count,
    /// and duration. Side-effect-free.
    pub fn summary(&self, coalesce_gap_ms: u64) -> TimelineSummary {
        let mut summary = TimelineSummary::default();
        let mut last_key_ts: Option<u64> = None;
        for event in &self.events {
            summary.total_events += 1;
            summary.duration_ms = summary.duration_ms.max(event.timestamp_ms());
            match event.payload() {
                EventPayload::Transcript { .. } => summary.transcripts += 1,
                EventPayload::Keystroke { .. } => {
                    summary.keystrokes += 1;
                    let ts = event.timestamp_ms();
                    let continues = matches!(
                        last_key_ts,
                        Some(prev) if ts.saturating_sub(prev) <= coalesce_gap_ms
                    );
                    if !continues {
                        summary.keystroke_runs += 1;
                    }
                    last_key_ts = Some(ts);
                }
                EventPayload::Clipboard { .. } => summary.clipboard_changes += 1,
                EventPayload::Screenshot { .. } => summary.screenshots += 1,
            }
        }
        summary
    }

    /// Merge consecutive keystrokes whose inter-arrival gap is within
    /// `gap_ms` into runs. Other event kinds do not split a run.
    pub fn keystroke_runs(&self, gap_ms: u64) -> Vec<KeystrokeRun> {
        let mut runs: Vec<KeystrokeRun> = Vec::new();
        let mut current: Option<KeystrokeRun> = None;
        let mut last_ts = 0u64;
        for event in &self.events {
            if let EventPayload::Keystroke { key, .. } = event.payload() {
                let ts = event.timestamp_ms();
                match current.as_mut() {
                    Some(run) if ts.saturating_sub(last_ts) <= gap_ms => {
                        run.end_ms = ts;
                        run.keys.push(key.clone());
                    }
                    _ => {
                        if let Some(run) = current.take() {
                            runs.push(run);
                        }
                        current = Some(KeystrokeRun {
                            start_ms: ts,
                            end_ms: ts,
                            keys: vec![key.clone()],
                            text: String::new(),
                        });
                    }
                }
                last_ts = ts;
            }
        }
        if let Some(run) = current.take() {
            runs.push(run);
        }
        for run in &mut runs {
            run.text = run.keys.concat();
        }
        runs
    }

    /// Coalesced view: non-keystroke events pass through individually,
    /// keystrokes appear as runs placed at their start timestamp.
    pub fn entries(&self, gap_ms: u64) -> Vec<TimelineEntry<'_>> {
        let runs = self.keystroke_runs(gap_ms);
        let mut runs_iter = runs.into_iter().peekable();
        let mut entries = Vec::new();
        for event in self
            .events
            .iter()
            .filter(|e| !matches!(e.payload(), EventPayload::Keystroke { .. }))
        {
            while let Some(run) = runs_iter.next_if(|r| r.start_ms <= event.timestamp_ms()) {
                entries.push(TimelineEntry::Keystrokes(run));
            }
            entries.push(TimelineEntry::Event(event));
        }
        entries.extend(runs_iter.map(TimelineEntry::Keystrokes));
        entries
    }
}
