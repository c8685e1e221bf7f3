//! Human-readable chronological document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::event::EventPayload;
use crate::session::{SessionContext, SessionWarning};
use crate::timeline::Timeline;

use super::format_timestamp;

/// Clipboard snippets longer than this are truncated in the document.
const CLIPBOARD_PREVIEW_LIMIT: usize = 500;

pub struct MarkdownGenerator<'a> {
    ctx: &'a SessionContext,
    timeline: &'a Timeline,
    warnings: &'a [SessionWarning],
    ended_at: DateTime<Utc>,
}

impl<'a> MarkdownGenerator<'a> {
    pub fn new(
        ctx: &'a SessionContext,
        timeline: &'a Timeline,
        warnings: &'a [SessionWarning],
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ctx,
            timeline,
            warnings,
            ended_at,
        }
    }

    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("# Recording Session".to_string());
        lines.push(String::new());
        lines.push(format!(
            "**Session Directory**: `{}`",
            self.ctx.dir.display()
        ));
        lines.push(format!(
            "**Started**: {}",
            self.ctx.started_at.format("%Y-%m-%d %H:%M:%S")
        ));
        let duration_s = (self.ended_at - self.ctx.started_at).num_seconds().max(0);
        let (mins, secs) = (duration_s / 60, duration_s % 60);
        lines.push(format!("**Duration**: {mins} minutes {secs} seconds"));
        lines.push(format!("**Model**: {}", self.ctx.config.model));
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push("## Timeline".to_string());
        lines.push(String::new());
        lines.push(format!("### {} Session Started", format_timestamp(0)));
        lines.push(String::new());

        for event in self.timeline.events() {
            let ts = format_timestamp(event.timestamp_ms());
            match event.payload() {
                EventPayload::Transcript { text, .. } => {
                    lines.push(format!("### {ts} Transcript"));
                    lines.push(format!("> {text}"));
                    lines.push(String::new());
                }
                EventPayload::Screenshot {
                    filename, trigger, ..
                } => {
                    lines.push(format!("### {ts} Screenshot"));
                    lines.push(format!("![Screenshot]({filename})"));
                    lines.push(format!("*Triggered by: {trigger}*"));
                    lines.push(String::new());
                }
                EventPayload::Clipboard { content } => {
                    lines.push(format!("### {ts} Clipboard"));
                    let preview: String = if content.chars().count() > CLIPBOARD_PREVIEW_LIMIT {
                        let truncated: String =
                            content.chars().take(CLIPBOARD_PREVIEW_LIMIT).collect();
                        format!("{truncated}...")
                    } else {
                        content.clone()
                    };
                    lines.push("```".to_string());
                    lines.push(preview);
                    lines.push("```".to_string());
                    lines.push(String::new());
                }
                // Individual keystrokes are rendered as sequences below.
                EventPayload::Keystroke { .. } => {}
            }
        }

        let end_ms = (self.ended_at - self.ctx.started_at).num_milliseconds().max(0) as u64;
        lines.push(format!("### {} Session Ended", format_timestamp(end_ms)));
        lines.push(String::new());

        let gap_ms = self.ctx.config.coalesce_gap.as_millis() as u64;
        let runs = self.timeline.keystroke_runs(gap_ms);
        if !runs.is_empty() {
            lines.push("## Keystroke Sequences".to_string());
            lines.push(String::new());
            for run in &runs {
                let ts = format_timestamp(run.start_ms);
                let escaped = run.text.replace('`', "\\`");
                lines.push(format!("- {ts} `{escaped}`"));
            }
            lines.push(String::new());
        }

        lines.push("---".to_string());
        lines.push(String::new());
        lines.push("## Summary Statistics".to_string());
        lines.push(String::new());
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
        lines.push(format!("- Total transcribed words: {word_count}"));
        lines.push(format!("- Screenshots taken: {}", summary.screenshots));
        lines.push(format!("- Clipboard events: {}", summary.clipboard_changes));
        lines.push(format!(
            "- Keystroke sequences logged: {}",
            summary.keystroke_runs
        ));
        lines.push(String::new());

        if !self.warnings.is_empty() {
            lines.push("## Warnings".to_string());
            lines.push(String::new());
            for warning in self.warnings {
                let source = warning
                    .source
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "session".to_string());
                lines.push(format!(
                    "- [{}/{}] {}",
                    warning.phase, source, warning.message
                ));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .with_context(|| format!("failed to write markdown output to {:?}", path))
    }
}
