//! Machine-parseable structured document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::event::EventPayload;
use crate::session::{SessionContext, SessionWarning, StopReason};
use crate::timeline::{Timeline, TimelineEntry};

pub struct JsonGenerator<'a> {
    ctx: &'a SessionContext,
    timeline: &'a Timeline,
    warnings: &'a [SessionWarning],
    ended_at: DateTime<Utc>,
    stop_reason: StopReason,
    events_dropped: u64,
}

impl<'a> JsonGenerator<'a> {
    pub fn new(
        ctx: &'a SessionContext,
        timeline: &'a Timeline,
        warnings: &'a [SessionWarning],
        ended_at: DateTime<Utc>,
        stop_reason: StopReason,
        events_dropped: u64,
    ) -> Self {
        Self {
            ctx,
            timeline,
            warnings,
            ended_at,
            stop_reason,
            events_dropped,
        }
    }

    pub fn render(&self) -> Result<String> {
        let gap_ms = self.ctx.config.coalesce_gap.as_millis() as u64;

        // Individual keystrokes are replaced by coalesced sequence entries;
        // everything else passes through as recorded.
        let mut events: Vec<serde_json::Value> = Vec::new();
        for entry in self.timeline.entries(gap_ms) {
            match entry {
                TimelineEntry::Event(event) => {
                    events.push(serde_json::to_value(event).context("failed to encode event")?);
                }
                TimelineEntry::Keystrokes(run) => {
                    events.push(json!({
                        "type": "keystroke_sequence",
                        "timestamp_ms": run.start_ms,
                        "data": {
                            "keys": run.keys,
                            "reconstructed": run.text,
                        },
                    }));
                }
            }
        }

        let summary = self.timeline.summary(gap_ms);
        let word_count: usize = self
            .timeline
            .events()
            .iter()
            .filter_map(|e| match e.payload() {
                EventPayload::Transcript { text, .. } => Some(text.split_whitespace().count()),
                _ => None,
            })
            .sum();

        let document = json!({
            "session": {
                "id": self.ctx.session_id,
                "started_at": self.ctx.started_at.to_rfc3339(),
                "ended_at": self.ended_at.to_rfc3339(),
                "duration_ms": (self.ended_at - self.ctx.started_at).num_milliseconds().max(0),
                "stop_reason": self.stop_reason,
                "config": {
                    "model": self.ctx.config.model,
                    "audio_device": self.ctx.config.audio_device,
                    "sample_rate": self.ctx.config.sample_rate,
                },
            },
            "events": events,
            "statistics": {
                "total_transcribed_words": word_count,
                "transcript_segments_count": summary.transcripts,
                "screenshots_count": summary.screenshots,
                "clipboard_events_count": summary.clipboard_changes,
                "keystroke_sequences_count": summary.keystroke_runs,
                "events_dropped": self.events_dropped,
            },
            "warnings": self.warnings,
        });

        serde_json::to_string_pretty(&document).context("failed to encode JSON document")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.render()?;
        fs::write(path, content)
            .with_context(|| format!("failed to write JSON output to {:?}", path))
    }
}
