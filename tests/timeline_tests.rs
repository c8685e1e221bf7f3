// Integration tests for the timeline: sorted insertion, freeze semantics,
// and read-time keystroke coalescing.

use contextrec::{Event, EventPayload, Timeline, TimelineEntry};

fn key(ts: u64, k: &str) -> Event {
    Event::keystroke(ts, k, false).unwrap()
}

#[test]
fn appends_stay_sorted_under_shuffled_delivery() {
    let mut timeline = Timeline::new();
    for ts in [500u64, 100, 900, 300, 700, 200, 800, 400, 600] {
        assert!(timeline.append(Event::clipboard(ts, format!("c{ts}")).unwrap()));
    }
    let timestamps: Vec<u64> = timeline.events().iter().map(|e| e.timestamp_ms()).collect();
    let mut sorted = timestamps.clone();
    sorted.sort_unstable();
    assert_eq!(timestamps, sorted, "timeline must be non-decreasing in timestamp");
}

#[test]
fn ties_keep_first_accepted_order() {
    let mut timeline = Timeline::new();
    timeline.append(Event::clipboard(100, "first").unwrap());
    timeline.append(Event::clipboard(100, "second").unwrap());

    let contents: Vec<&str> = timeline
        .events()
        .iter()
        .map(|e| match e.payload() {
            EventPayload::Clipboard { content } => content.as_str(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(contents, vec!["first", "second"], "ties break by arrival order");
}

#[test]
fn frozen_timeline_ignores_appends() {
    let mut timeline = Timeline::new();
    timeline.append(Event::clipboard(10, "kept").unwrap());
    timeline.freeze();
    assert!(timeline.is_frozen());

    assert!(!timeline.append(Event::clipboard(20, "rejected").unwrap()));
    assert_eq!(timeline.len(), 1, "append after freeze must not alter state");
    assert_eq!(timeline.events()[0].timestamp_ms(), 10);
}

#[test]
fn keystrokes_within_gap_coalesce_into_one_run() {
    let mut timeline = Timeline::new();
    for (i, c) in "hello".chars().enumerate() {
        timeline.append(key(100 + i as u64 * 150, &c.to_string()));
    }
    let runs = timeline.keystroke_runs(2000);
    assert_eq!(runs.len(), 1, "gaps below the threshold merge into one run");
    assert_eq!(runs[0].text, "hello");
    assert_eq!(runs[0].start_ms, 100);
    assert_eq!(runs[0].end_ms, 700);

    let summary = timeline.summary(2000);
    assert_eq!(summary.keystroke_runs, 1);
    assert_eq!(summary.keystrokes, 5);
}

#[test]
fn keystrokes_past_gap_split_runs() {
    let mut timeline = Timeline::new();
    timeline.append(key(100, "l"));
    timeline.append(key(300, "s"));
    // inter-arrival gap of 3s, past the 2s threshold
    timeline.append(key(3300, "c"));
    timeline.append(key(3500, "d"));

    let runs = timeline.keystroke_runs(2000);
    assert_eq!(runs.len(), 2, "gap above the threshold starts a new run");
    assert_eq!(runs[0].text, "ls");
    assert_eq!(runs[1].text, "cd");
    assert_eq!(timeline.summary(2000).keystroke_runs, 2);
}

#[test]
fn other_events_do_not_split_a_run() {
    let mut timeline = Timeline::new();
    timeline.append(key(100, "o"));
    timeline.append(Event::clipboard(150, "paste").unwrap());
    timeline.append(key(200, "k"));

    let runs = timeline.keystroke_runs(2000);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "ok");
}

#[test]
fn entries_interleave_runs_with_other_events() {
    let mut timeline = Timeline::new();
    timeline.append(key(100, "h"));
    timeline.append(key(200, "i"));
    timeline.append(Event::clipboard(5000, "later").unwrap());

    let entries = timeline.entries(2000);
    assert_eq!(entries.len(), 2);
    match &entries[0] {
        TimelineEntry::Keystrokes(run) => assert_eq!(run.text, "hi"),
        other => panic!("expected keystroke run first, got {other:?}"),
    }
    match &entries[1] {
        TimelineEntry::Event(event) => assert_eq!(event.timestamp_ms(), 5000),
        other => panic!("expected clipboard event second, got {other:?}"),
    }
}

#[test]
fn summary_counts_every_kind_in_one_pass() {
    let mut timeline = Timeline::new();
    timeline.append(Event::transcript(100, 600, "hello there", 0.9).unwrap());
    timeline.append(key(700, "a"));
    timeline.append(Event::clipboard(900, "copied").unwrap());
    timeline
        .append(Event::screenshot(1200, "img_001200.png", 800, 600, contextrec::ScreenshotTrigger::Manual).unwrap());

    let summary = timeline.summary(2000);
    assert_eq!(summary.total_events, 4);
    assert_eq!(summary.transcripts, 1);
    assert_eq!(summary.keystrokes, 1);
    assert_eq!(summary.clipboard_changes, 1);
    assert_eq!(summary.screenshots, 1);
    assert_eq!(summary.duration_ms, 1200);
}
