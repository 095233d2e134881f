//! Feed a capture of bridge callbacks through a controller and report what
//! came out.
//!
//! Capture format, one JSON object per line:
//!
//! ```text
//! {"kind":"viseme","payload":"[-2,0,0,0,0,0,0,0,0,0,0,0,0,0,0]"}
//! {"kind":"audio","payload":"{\"audData\":[0,0],\"sampleRate\":16000}"}
//! ```

use std::path::{Path, PathBuf};

use npc_bridge_core::{
    ActiveCharacter, BridgeCommand, BridgeConfig, BridgeController, BridgeEvent, ChannelBridge,
    ControllerStats, DecodedAudio,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug)]
struct Args {
    capture: PathBuf,
    config: Option<PathBuf>,
    wav_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CallbackKind {
    Audio,
    Viseme,
    User,
    Narrative,
    Action,
}

#[derive(Debug, Deserialize)]
struct CaptureLine {
    kind: CallbackKind,
    payload: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    capture: String,
    lines: usize,
    failed_lines: Vec<usize>,
    segments: usize,
    segment_lengths: Vec<usize>,
    clips: usize,
    clip_secs: f64,
    events: Vec<BridgeEvent>,
    commands: Vec<BridgeCommand>,
    stats: ControllerStats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("replay failed: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Args, String> {
    let mut capture: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut wav_dir: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --config".into());
                };
                config = Some(PathBuf::from(v));
            }
            "--wav-dir" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --wav-dir".into());
                };
                wav_dir = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p npc-bridge-core --bin replay -- \\
  <capture.jsonl> [--config <config.json>] [--wav-dir <dir>]"
                );
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown argument: {other}"));
            }
            other => capture = Some(PathBuf::from(other)),
        }
    }

    let capture = capture.ok_or_else(|| "missing capture file".to_string())?;
    Ok(Args {
        capture,
        config,
        wav_dir,
    })
}

fn run() -> Result<(), String> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => BridgeConfig::load(path).map_err(|e| e.to_string())?,
        None => BridgeConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.capture).map_err(|e| e.to_string())?;

    let (bridge, commands_rx) = ChannelBridge::new();
    let mut controller = BridgeController::new(config, bridge);
    let mut events_rx = controller.subscribe();
    controller.start();
    controller
        .set_active_character(ActiveCharacter::new("replay", "Replay"))
        .map_err(|e| e.to_string())?;

    let lip_sync = controller
        .character()
        .map(|c| c.lip_sync().clone())
        .ok_or("character missing after activation")?;
    let audio = controller
        .character()
        .map(|c| c.audio().clone())
        .ok_or("character missing after activation")?;

    let mut lines = 0;
    let mut failed_lines = Vec::new();
    let mut events = Vec::new();

    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;
        let line_no = idx + 1;

        let entry: CaptureLine = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(line = line_no, "unreadable capture line: {e}");
                failed_lines.push(line_no);
                continue;
            }
        };

        let result = match entry.kind {
            CallbackKind::Audio => controller.on_audio_response(&entry.payload),
            CallbackKind::Viseme => controller.on_viseme_response(&entry.payload).map(|_| ()),
            CallbackKind::User => {
                controller.on_user_response(&entry.payload);
                Ok(())
            }
            CallbackKind::Narrative => {
                controller.on_narrative_section(&entry.payload);
                Ok(())
            }
            CallbackKind::Action => {
                controller.on_action_response(&entry.payload);
                Ok(())
            }
        };
        if result.is_err() {
            failed_lines.push(line_no);
        }

        // Drain as we go so the broadcast buffer never lags.
        while let Ok(event) = events_rx.try_recv() {
            events.push(event);
        }
    }

    let mut clips = Vec::new();
    while let Some(chunk) = audio.0.lock().pop() {
        clips.push(chunk.clip);
    }

    if let Some(dir) = &args.wav_dir {
        std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
        for (i, clip) in clips.iter().enumerate() {
            let path = dir.join(format!("clip-{i:04}.wav"));
            write_wav(&path, clip)?;
        }
        info!(count = clips.len(), dir = %dir.display(), "clips written");
    }

    let timeline = lip_sync.0.lock();
    let summary = Summary {
        capture: args.capture.display().to_string(),
        lines,
        failed_lines,
        segments: timeline.len(),
        segment_lengths: timeline.segments().iter().map(|s| s.len()).collect(),
        clips: clips.len(),
        clip_secs: clips.iter().map(DecodedAudio::duration_secs).sum(),
        events,
        commands: commands_rx.try_iter().collect(),
        stats: controller.stats(),
    };

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn write_wav(path: &Path, clip: &DecodedAudio) -> Result<(), String> {
    let spec = hound::WavSpec {
        channels: clip.channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| e.to_string())?;
    for s in &clip.samples {
        let v = (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(v).map_err(|e| e.to_string())?;
    }
    writer.finalize().map_err(|e| e.to_string())
}
