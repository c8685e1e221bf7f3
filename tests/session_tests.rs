// End-to-end lifecycle tests for the recording session, driven by the
// simulated capture backends.

use std::time::{Duration, Instant};

use contextrec::capture::sim::{
    FailingClipboard, ScriptedKey, SimAudioCapture, SimClipboard, SimKeyboard, SimScreenGrabber,
    SimTranscriber, UnavailableKeyboard,
};
use contextrec::{
    CaptureHooks, CaptureKind, EventPayload, FailurePhase, RecordingSession, SessionConfig,
    SessionState, StopReason,
};
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> SessionConfig {
    SessionConfig {
        output_dir: dir.path().to_path_buf(),
        save_audio: false,
        clipboard_poll_interval: Duration::from_millis(25),
        hotkey_window: Duration::from_millis(300),
        source_stop_timeout: Duration::from_millis(1500),
        drain_grace: Duration::from_millis(800),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn source_init_failure_keeps_session_running() {
    let dir = TempDir::new().unwrap();
    let hooks = CaptureHooks {
        audio: Some(Box::new(SimAudioCapture::new(16000, 1, 50))),
        transcriber: Some(Box::new(SimTranscriber::new(
            vec![(80, SimTranscriber::segment("still here", 0.9, 40, 70))],
            vec![],
        ))),
        keyboard: Some(Box::new(UnavailableKeyboard::new(
            "accessibility permission denied",
        ))),
        clipboard: Some(Box::new(SimClipboard::new(
            "",
            vec![(100, "copied later".to_string())],
        ))),
        screen: Some(Box::new(SimScreenGrabber::new(800, 600))),
    };

    let mut session = RecordingSession::new(test_config(&dir), hooks);
    session.start().await.expect("session must start despite a failing source");
    assert_eq!(session.state(), SessionState::Running);
    assert!(
        session.warnings().iter().any(|w| {
            w.phase == FailurePhase::Init && w.source == Some(CaptureKind::Keystroke)
        }),
        "keyboard init failure must be recorded as a warning"
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    let report = session.stop(StopReason::Requested).await.unwrap();

    assert_eq!(session.state(), SessionState::Stopped);
    assert!(report.summary.transcripts >= 1, "transcript source must stay live");
    assert!(report.summary.clipboard_changes >= 1, "clipboard source must stay live");
    assert_eq!(report.summary.keystrokes, 0);
}

#[tokio::test]
async fn buffered_segment_survives_shutdown() {
    let dir = TempDir::new().unwrap();
    let transcriber = SimTranscriber::new(
        vec![],
        vec![SimTranscriber::segment(
            "one last thought",
            0.85,
            400,
            650,
        )],
    )
    .with_flush_delay(Duration::from_millis(200));
    let hooks = CaptureHooks {
        audio: Some(Box::new(SimAudioCapture::new(16000, 1, 50))),
        transcriber: Some(Box::new(transcriber)),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_keystrokes = false;
    config.enable_clipboard = false;
    config.enable_screenshots = false;
    config.save_audio = true;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;

    let stopping = Instant::now();
    let report = session.stop(StopReason::Interrupt).await.unwrap();
    let stop_elapsed = stopping.elapsed();

    let transcript_texts: Vec<&str> = report
        .timeline
        .events()
        .iter()
        .filter_map(|e| match e.payload() {
            EventPayload::Transcript { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(
        transcript_texts.contains(&"one last thought"),
        "segment buffered in the transcriber must be flushed into the timeline, got {transcript_texts:?}"
    );
    assert!(
        stop_elapsed < Duration::from_secs(3),
        "stop must finish within the configured bounds, took {stop_elapsed:?}"
    );
    assert!(
        report.session_dir.join("audio.wav").exists(),
        "raw audio artifact must be finalized on stop"
    );
}

#[tokio::test]
async fn unresponsive_transcriber_is_force_finalized() {
    let dir = TempDir::new().unwrap();
    let transcriber = SimTranscriber::new(
        vec![(60, SimTranscriber::segment("on time", 0.9, 30, 50))],
        vec![SimTranscriber::segment("too late", 0.5, 500, 600)],
    )
    .with_flush_delay(Duration::from_secs(5));
    let hooks = CaptureHooks {
        audio: Some(Box::new(SimAudioCapture::new(16000, 1, 50))),
        transcriber: Some(Box::new(transcriber)),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_keystrokes = false;
    config.enable_clipboard = false;
    config.enable_screenshots = false;
    config.source_stop_timeout = Duration::from_millis(300);
    config.drain_grace = Duration::from_millis(300);

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopping = Instant::now();
    let report = session.stop(StopReason::Interrupt).await.unwrap();
    let stop_elapsed = stopping.elapsed();

    assert!(
        stop_elapsed < Duration::from_secs(2),
        "a hung source must not block teardown, took {stop_elapsed:?}"
    );
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(
        report.warnings.iter().any(|w| {
            w.phase == FailurePhase::Teardown && w.source == Some(CaptureKind::Transcript)
        }),
        "the timed-out stop must be recorded as a teardown warning"
    );
    assert!(
        report.summary.transcripts >= 1,
        "segments delivered before the hang must still be in the timeline"
    );
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let hooks = CaptureHooks {
        clipboard: Some(Box::new(SimClipboard::new(
            "",
            vec![(60, "copied".to_string())],
        ))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_keystrokes = false;
    config.enable_screenshots = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let first = session.stop(StopReason::Interrupt).await.unwrap();
    let second = session.stop(StopReason::Interrupt).await.unwrap();

    assert_eq!(first.timeline.len(), second.timeline.len());
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.session_id, second.session_id);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn hotkey_sequence_triggers_screenshot() {
    let dir = TempDir::new().unwrap();
    let keys = vec![
        ScriptedKey::new(40, "h", false),
        ScriptedKey::new(80, "i", false),
        ScriptedKey::new(200, "j", false),
        ScriptedKey::new(260, "j", false),
    ];
    let hooks = CaptureHooks {
        keyboard: Some(Box::new(SimKeyboard::new(keys))),
        screen: Some(Box::new(SimScreenGrabber::new(1024, 768))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_clipboard = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    let report = session.stop(StopReason::Interrupt).await.unwrap();

    assert_eq!(report.summary.screenshots, 1, "jj within the window must screenshot once");
    // h, i, and the first j are logged; the completing j is suppressed
    assert_eq!(report.summary.keystrokes, 3);

    let screenshot = report
        .timeline
        .events()
        .iter()
        .find_map(|e| match e.payload() {
            EventPayload::Screenshot {
                filename,
                width,
                height,
                ..
            } => Some((filename.clone(), *width, *height)),
            _ => None,
        })
        .expect("screenshot event must be in the timeline");
    assert!(
        report.session_dir.join(&screenshot.0).exists(),
        "screenshot file must be persisted in the session directory"
    );
    assert_eq!((screenshot.1, screenshot.2), (1024, 768));
}

#[tokio::test]
async fn spaced_keys_do_not_trigger_screenshot() {
    let dir = TempDir::new().unwrap();
    let keys = vec![
        ScriptedKey::new(40, "j", false),
        // outside the 300ms hotkey window
        ScriptedKey::new(450, "j", false),
    ];
    let hooks = CaptureHooks {
        keyboard: Some(Box::new(SimKeyboard::new(keys))),
        screen: Some(Box::new(SimScreenGrabber::new(1024, 768))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_clipboard = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    let report = session.stop(StopReason::Interrupt).await.unwrap();

    assert_eq!(report.summary.screenshots, 0, "keys outside the window are ordinary input");
    assert_eq!(report.summary.keystrokes, 2);
}

#[tokio::test]
async fn clipboard_changes_are_edge_triggered() {
    let dir = TempDir::new().unwrap();
    let hooks = CaptureHooks {
        clipboard: Some(Box::new(SimClipboard::new(
            "pre-existing content",
            vec![
                (80, "alpha".to_string()),
                (300, "beta".to_string()),
            ],
        ))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_keystrokes = false;
    config.enable_screenshots = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let report = session.stop(StopReason::Interrupt).await.unwrap();

    let contents: Vec<&str> = report
        .timeline
        .events()
        .iter()
        .filter_map(|e| match e.payload() {
            EventPayload::Clipboard { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        contents,
        vec!["alpha", "beta"],
        "identical polls must not duplicate events and primed content must not fire"
    );
}

#[tokio::test]
async fn persistent_clipboard_failure_stops_source_not_session() {
    let dir = TempDir::new().unwrap();
    let hooks = CaptureHooks {
        clipboard: Some(Box::new(FailingClipboard)),
        screen: Some(Box::new(SimScreenGrabber::new(640, 480))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_keystrokes = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    // five failed polls at 25ms each, then the source gives up
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(session.state(), SessionState::Running);

    let report = session.stop(StopReason::Interrupt).await.unwrap();
    assert!(
        report.warnings.iter().any(|w| {
            w.phase == FailurePhase::Runtime && w.source == Some(CaptureKind::Clipboard)
        }),
        "persistent reader failure must surface as a runtime warning"
    );
}

#[tokio::test]
async fn voice_stop_phrase_requests_stop() {
    let dir = TempDir::new().unwrap();
    let transcriber = SimTranscriber::new(
        vec![
            (80, SimTranscriber::segment("marco", 0.9, 40, 70)),
            (200, SimTranscriber::segment("we are done, Finito.", 0.9, 150, 190)),
        ],
        vec![],
    );
    let hooks = CaptureHooks {
        audio: Some(Box::new(SimAudioCapture::new(16000, 1, 50))),
        transcriber: Some(Box::new(transcriber)),
        screen: Some(Box::new(SimScreenGrabber::new(800, 600))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_keystrokes = false;
    config.enable_clipboard = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();

    let reason = tokio::time::timeout(Duration::from_secs(3), session.wait())
        .await
        .expect("voice stop phrase must resolve wait()");
    assert_eq!(reason, StopReason::VoiceCommand);

    let report = session.stop(reason).await.unwrap();
    assert_eq!(report.stop_reason, StopReason::VoiceCommand);
    assert_eq!(
        report.summary.screenshots, 1,
        "the voice trigger word must have captured a screenshot"
    );
}

#[tokio::test]
async fn manual_screenshot_request_is_served() {
    let dir = TempDir::new().unwrap();
    let hooks = CaptureHooks {
        screen: Some(Box::new(SimScreenGrabber::new(320, 200))),
        ..CaptureHooks::default()
    };
    let mut config = test_config(&dir);
    config.enable_transcript = false;
    config.enable_keystrokes = false;
    config.enable_clipboard = false;

    let mut session = RecordingSession::new(config, hooks);
    session.start().await.unwrap();
    session.request_screenshot().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = session.stop(StopReason::Interrupt).await.unwrap();

    assert_eq!(report.summary.screenshots, 1);
}
