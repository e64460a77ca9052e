//! Replay recorded poses against a running coach server.
//!
//! Input is JSON lines: each line is one frame, either an array of 17
//! keypoints (`{"x":..,"y":..,"score":..}`) or `null` when nobody was in
//! view. Overlays, speech and chat messages are printed to stdout.
//!
//! Usage:
//!   cargo run --bin pose_replay -- --file session.jsonl --workout

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pose_coach::cadence::{CoachEvent, CoachRuntime, CoachSettings, Coordinator, Platform};
use pose_coach::client::CoachClient;
use pose_coach::config::{Config, RuntimeConfig};
use pose_coach::conversation::Role;
use pose_coach::overlay::Overlay;
use pose_coach::pose::Pose;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pose_replay")]
#[command(about = "Drive the coaching loop from a recorded pose file", long_about = None)]
struct Cli {
    /// JSON-lines file of recorded frames
    #[arg(long)]
    file: PathBuf,
    /// Coach server base URL
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,
    /// Playback rate in frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Start a workout before the first frame and end it after the last
    #[arg(long)]
    workout: bool,
    /// Exercise label sent with feedback requests
    #[arg(long)]
    exercise: Option<String>,
    /// Print every overlay instead of only subject changes
    #[arg(long)]
    verbose: bool,
}

/// Prints to stdout; speech "plays" for a time proportional to its length
struct ConsolePlatform {
    events: mpsc::UnboundedSender<CoachEvent>,
    verbose: bool,
    subject_visible: Option<bool>,
}

impl Platform for ConsolePlatform {
    fn render(&mut self, overlay: &Overlay) {
        let visible = overlay.is_subject_visible();
        if !self.verbose && self.subject_visible == Some(visible) {
            return;
        }
        self.subject_visible = Some(visible);
        match overlay {
            Overlay::NoSubject { message } => println!("[overlay] {}", message),
            Overlay::Skeleton { readout, .. } => {
                let lines = readout.as_ref().map(|r| r.lines()).unwrap_or_default();
                println!("[overlay] {}", lines.join(" | "));
            }
        }
    }

    fn speak(&mut self, text: &str) {
        println!("[coach] {}", text);
        let tx = self.events.clone();
        let words = text.split_whitespace().count() as u64;
        tokio::spawn(async move {
            let _ = tx.send(CoachEvent::OutputStarted);
            tokio::time::sleep(Duration::from_millis(300 * words.max(1))).await;
            let _ = tx.send(CoachEvent::OutputEnded);
        });
    }

    fn start_input(&mut self) {}

    fn stop_input(&mut self) {}

    fn show_message(&mut self, role: Role, text: &str) {
        println!("[{:?}] {}", role, text);
    }

    fn status(&mut self, text: &str) {
        info!("status: {}", text);
    }
}

fn read_frames(path: &Path) -> Result<Vec<Option<Pose>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut frames = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame: Option<Pose> = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: not a pose", path.display(), n + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    pose_coach::load_env();
    pose_coach::init_tracing(&RuntimeConfig::load_from_env().log_level);

    let config = Config::load()?;

    let frames = read_frames(&cli.file)?;
    info!("Replaying {} frames at {} fps", frames.len(), cli.fps);

    let mut settings = CoachSettings::from(&config.coaching);
    if let Some(exercise) = cli.exercise {
        settings.exercise = exercise;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let platform = ConsolePlatform {
        events: tx.clone(),
        verbose: cli.verbose,
        subject_visible: None,
    };
    let backend = Arc::new(CoachClient::new(
        cli.server,
        Duration::from_millis(config.model.timeout_ms + 5_000),
    ));
    let runtime = CoachRuntime::new(Coordinator::new(settings), backend, platform, tx.clone(), rx);
    let handle = tokio::spawn(runtime.run());

    if cli.workout {
        tx.send(CoachEvent::StartWorkout)?;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1) / cli.fps.max(1));
    for pose in frames {
        ticker.tick().await;
        tx.send(CoachEvent::Frame { pose })?;
    }

    if cli.workout {
        tx.send(CoachEvent::EndWorkout)?;
        // let the session close and the sign-off play
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    tx.send(CoachEvent::Shutdown)?;

    match handle.await {
        Ok((coordinator, _)) => info!(
            "Replay finished, {} conversation turns",
            coordinator.history().len()
        ),
        Err(e) => warn!("coach runtime panicked: {}", e),
    }
    Ok(())
}
