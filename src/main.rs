use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use contextrec::capture::sim;
use contextrec::{FileConfig, RecordingSession, SessionConfig, StopReason};

#[derive(Parser)]
#[command(
    name = "contextrec",
    version,
    about = "Record working-session context (speech, keys, clipboard, screenshots) for AI assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a recording session. Ctrl+C (or the voice stop phrase)
    /// stops it and writes the output artifacts.
    Record(RecordArgs),
}

#[derive(Args)]
struct RecordArgs {
    /// Output directory for sessions (default: ~/.contextrec/sessions)
    #[arg(short, long)]
    output: Option<String>,

    /// Transcription model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Audio input device name
    #[arg(long)]
    device: Option<String>,

    /// Disable keystroke logging
    #[arg(long)]
    no_keys: bool,

    /// Disable clipboard monitoring
    #[arg(long)]
    no_clipboard: bool,

    /// Skip saving the raw audio artifact
    #[arg(long)]
    no_audio: bool,

    /// Hotkey sequence for screenshots
    #[arg(long)]
    hotkey: Option<String>,

    /// Voice trigger word for screenshots
    #[arg(long)]
    voice: Option<String>,

    /// Voice phrase that stops the recording
    #[arg(long)]
    voice_stop: Option<String>,

    /// Words to boost recognition for (repeatable)
    #[arg(long = "vocab")]
    vocab: Vec<String>,

    /// Run against the built-in simulated capture backends
    #[arg(long)]
    simulate: bool,

    /// Open the markdown artifact when the session ends
    #[arg(long)]
    open: bool,

    /// Config file path (without extension)
    #[arg(long, default_value = "config/contextrec")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Record(args) => record(args).await,
    }
}

async fn record(args: RecordArgs) -> Result<()> {
    let mut config = FileConfig::load(&args.config)?.apply(SessionConfig::default());

    if let Some(output) = &args.output {
        config.output_dir = PathBuf::from(shellexpand::tilde(output).as_ref());
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.device.is_some() {
        config.audio_device = args.device;
    }
    if args.no_keys {
        config.enable_keystrokes = false;
    }
    if args.no_clipboard {
        config.enable_clipboard = false;
    }
    if args.no_audio {
        config.save_audio = false;
    }
    if let Some(hotkey) = args.hotkey {
        config.hotkey_screenshot = hotkey;
    }
    if let Some(voice) = args.voice {
        config.voice_trigger = voice;
    }
    if let Some(voice_stop) = args.voice_stop {
        config.voice_stop = voice_stop;
    }
    if !args.vocab.is_empty() {
        config.vocabulary_boost = args.vocab;
    }

    let hooks = if args.simulate {
        info!("using simulated capture backends");
        sim::demo_hooks()
    } else {
        anyhow::bail!(
            "no platform capture backends are bundled in this build; \
             run with --simulate, or wire real backends through contextrec::CaptureHooks"
        );
    };

    println!("contextrec - recording session");
    println!("  Output:     {}", config.output_dir.display());
    println!("  Model:      {}", config.model);
    println!(
        "  Device:     {}",
        config.audio_device.as_deref().unwrap_or("default")
    );
    println!(
        "  Keylogging: {}",
        if config.enable_keystrokes { "enabled" } else { "disabled" }
    );
    println!(
        "  Clipboard:  {}",
        if config.enable_clipboard { "enabled" } else { "disabled" }
    );
    println!(
        "  Screenshot: type '{}' or say \"{}\"",
        config.hotkey_screenshot, config.voice_trigger
    );
    println!("  Stop:       Ctrl+C or say \"{}\"", config.voice_stop);
    println!();

    let mut session = RecordingSession::new(config, hooks);
    session.start().await?;

    let reason = tokio::select! {
        _ = tokio::signal::ctrl_c() => StopReason::Interrupt,
        reason = session.wait() => reason,
    };
    if reason == StopReason::VoiceCommand {
        println!("\nVoice stop phrase detected");
    }
    println!("Stopping recording...");

    let report = session.stop(reason).await?;

    println!();
    println!("Session saved to {}", report.session_dir.display());
    println!(
        "  {} events over {:.1}s ({} transcript, {} keystrokes, {} clipboard, {} screenshots)",
        report.summary.total_events,
        report.duration_ms as f64 / 1000.0,
        report.summary.transcripts,
        report.summary.keystrokes,
        report.summary.clipboard_changes,
        report.summary.screenshots,
    );
    if !report.warnings.is_empty() {
        println!("  {} warnings:", report.warnings.len());
        for warning in &report.warnings {
            println!("    - {}", warning.message);
        }
    }

    if args.open {
        let md_path = report.session_dir.join("recording.md");
        if md_path.exists() {
            open_path(&md_path);
        }
    }

    Ok(())
}

fn open_path(path: &std::path::Path) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    if let Err(e) = ProcessCommand::new(opener).arg(path).spawn() {
        info!("could not open {}: {}", path.display(), e);
    }
}
