mod args;
mod config;
mod error;
mod media;
mod reddit;
mod subtitle;
mod tts;
mod utils;
mod video;

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::{info, warn};

use crate::args::Args;
use crate::config::Credentials;
use crate::tts::Voice;

/// Scratch space for narration chunks and subtitles, recreated per run.
const WORK_DIR: &str = "work_tmp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info") // set to "debug" for more logs
        .init();

    info!("Starting reddit story video pipeline");

    let args = Args::parse();
    if args.speed <= 0.0 {
        anyhow::bail!("--speed must be positive, got {}", args.speed);
    }
    let creds = Credentials::from_env()?;
    media::require_tools()?;

    let background = Path::new(&args.background);
    if !background.exists() {
        anyhow::bail!("background video not found: {}", args.background);
    }
    info!("Background video found: {}", args.background);

    let work_dir = Path::new(WORK_DIR);
    if work_dir.exists() {
        fs::remove_dir_all(work_dir)?;
    }
    fs::create_dir_all(work_dir)?;

    info!("Fetching story from r/{}", args.subreddit);
    let story = reddit::fetch_story(&creds, &args.subreddit, args.limit).await?;

    let mut text = utils::clean_markdown(&story.narration_text());
    if let Some(max_seconds) = args.max_seconds {
        // The tempo filter shortens playback, so the raw-voice allowance
        // is the cap scaled back up by the speed factor.
        let estimated = utils::estimate_duration_seconds(&text) / args.speed;
        if estimated > max_seconds {
            text = utils::truncate_to_duration(&text, max_seconds * args.speed);
            info!(
                "Story trimmed to fit under {:.0}s (was ~{:.0}s)",
                max_seconds, estimated
            );
        }
    }

    let voice = Voice {
        lang: args.voice_lang.clone(),
        tld: args.voice_tld.clone(),
        speed: args.speed,
    };
    let narration = tts::synthesize(
        &text,
        &voice,
        args.chunk_chars,
        work_dir,
        Path::new(&args.narration),
    )
    .await?;

    let cues = subtitle::build_cues(&narration.segments);
    let srt_path = work_dir.join("subs.srt");
    subtitle::write_srt(&srt_path, &cues)?;
    info!("Wrote {} subtitle cues to {}", cues.len(), srt_path.display());

    video::compose(background, &narration, &srt_path, Path::new(&args.out))?;

    if let Err(e) = fs::remove_dir_all(work_dir) {
        warn!("Could not remove scratch dir {}: {}", WORK_DIR, e);
    }

    info!("Final video written to {}", args.out);
    Ok(())
}
