use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::media;
use crate::utils::chunk_text;

/// Pause between TTS requests, to stay polite with the endpoint.
const REQUEST_PAUSE_MS: u64 = 150;

/// Web-client identifier the translate endpoint expects.
const TTS_CLIENT: &str = "tw-ob";

/// Voice selection for the translate TTS endpoint. The domain suffix picks
/// the regional accent, the same way the web client routes requests.
#[derive(Debug, Clone)]
pub struct Voice {
    pub lang: String,
    pub tld: String,
    pub speed: f64,
}

/// Finished narration: the rendered audio file, its measured duration, and
/// the per-chunk durations subtitle timing is built from.
#[derive(Debug)]
pub struct NarrationAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub duration_seconds: f64,
}

/// Synthesizes `text` into a single MP3 at `out_path`. The text is split
/// into sentence-aligned chunks (the service caps request length), each
/// chunk fetched and retimed separately, then all parts are concatenated.
pub async fn synthesize(
    text: &str,
    voice: &Voice,
    chunk_chars: usize,
    work_dir: &Path,
    out_path: &Path,
) -> Result<NarrationAsset> {
    if text.trim().is_empty() {
        return Err(PipelineError::SynthesisFailed(
            "input text is empty".to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(synth_err)?;

    let chunks = chunk_text(text, chunk_chars);
    info!("Synthesizing narration in {} chunks", chunks.len());

    let mut part_files = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        debug!(
            "Requesting TTS chunk {}/{} ({} chars)",
            i + 1,
            chunks.len(),
            chunk.len()
        );
        let raw = work_dir.join(format!("part_{i:03}_raw.mp3"));
        fetch_chunk(&client, voice, chunk, &raw).await?;

        let part = if voice.speed != 1.0 {
            let retimed = work_dir.join(format!("part_{i:03}.mp3"));
            retime(&raw, &retimed, voice.speed)?;
            retimed
        } else {
            raw
        };
        part_files.push(part);

        sleep(Duration::from_millis(REQUEST_PAUSE_MS)).await;
    }

    let mut segments = Vec::new();
    for (chunk, part) in chunks.iter().zip(&part_files) {
        let duration = media::probe_duration(part).map_err(|e| synth_msg(e.to_string()))?;
        segments.push(Segment {
            text: chunk.clone(),
            duration_seconds: duration,
        });
    }

    concat_parts(&part_files, work_dir, out_path)?;

    let duration = media::probe_duration(out_path).map_err(|e| synth_msg(e.to_string()))?;
    info!(
        "Narration written to {} ({:.2}s)",
        out_path.display(),
        duration
    );
    Ok(NarrationAsset {
        path: out_path.to_path_buf(),
        duration_seconds: duration,
        segments,
    })
}

async fn fetch_chunk(
    client: &reqwest::Client,
    voice: &Voice,
    text: &str,
    out_path: &Path,
) -> Result<()> {
    let url = format!("https://translate.google.{}/translate_tts", voice.tld);
    let bytes = client
        .get(&url)
        .query(&[
            ("ie", "UTF-8"),
            ("client", TTS_CLIENT),
            ("tl", voice.lang.as_str()),
            ("q", text),
        ])
        .send()
        .await
        .map_err(synth_err)?
        .error_for_status()
        .map_err(synth_err)?
        .bytes()
        .await
        .map_err(synth_err)?;

    if bytes.is_empty() {
        return Err(synth_msg(format!(
            "service returned no audio for chunk {}",
            out_path.display()
        )));
    }
    fs::write(out_path, &bytes)?;
    Ok(())
}

/// atempo accepts 0.5-2.0 per filter instance; faster factors chain a
/// second instance.
fn atempo_chain(speed: f64) -> String {
    if speed <= 2.0 {
        format!("atempo={speed}")
    } else {
        format!("atempo=2.0,atempo={:.4}", speed / 2.0)
    }
}

fn retime(input: &Path, output: &Path, speed: f64) -> Result<()> {
    debug!("Retiming {} by {}x", input.display(), speed);
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-filter:a", &atempo_chain(speed), "-vn"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        return Err(synth_msg(format!(
            "ffmpeg atempo failed for {}",
            input.display()
        )));
    }
    Ok(())
}

/// Concatenates the chunk files into `out_path` via the concat demuxer,
/// first with stream copy, then re-encoding if the copy is rejected.
fn concat_parts(parts: &[PathBuf], work_dir: &Path, out_path: &Path) -> Result<()> {
    let list_name = "parts.txt";
    let combined_name = "narration_combined.mp3";
    {
        let mut list = File::create(work_dir.join(list_name))?;
        for part in parts {
            let name = part
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| synth_msg(format!("invalid part filename {}", part.display())))?;
            writeln!(list, "file '{name}'")?;
        }
    }

    let copy_args = ["-c", "copy"];
    let reencode_args = ["-c:a", "libmp3lame"];
    if !run_concat(work_dir, list_name, &copy_args, combined_name)? {
        warn!("Stream-copy concat failed; retrying with re-encode");
        if !run_concat(work_dir, list_name, &reencode_args, combined_name)? {
            return Err(synth_msg("could not concatenate narration chunks".to_string()));
        }
    }

    fs::copy(work_dir.join(combined_name), out_path)?;
    Ok(())
}

fn run_concat(work_dir: &Path, list_name: &str, codec: &[&str], out_name: &str) -> Result<bool> {
    let status = Command::new("ffmpeg")
        .current_dir(work_dir)
        .args(["-y", "-f", "concat", "-safe", "0", "-i", list_name])
        .args(codec)
        .arg(out_name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

fn synth_err(e: reqwest::Error) -> PipelineError {
    PipelineError::SynthesisFailed(e.to_string())
}

fn synth_msg(msg: impl Into<String>) -> PipelineError {
    PipelineError::SynthesisFailed(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_text_fails_before_any_request() {
        let voice = Voice {
            lang: "en".into(),
            tld: "com".into(),
            speed: 1.0,
        };
        let err = synthesize("   \n ", &voice, 180, Path::new("unused"), Path::new("unused.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SynthesisFailed(_)));
    }

    #[test]
    fn atempo_single_filter_up_to_double_speed() {
        assert_eq!(atempo_chain(1.5), "atempo=1.5");
        assert_eq!(atempo_chain(2.0), "atempo=2");
    }

    #[test]
    fn atempo_chains_above_double_speed() {
        assert_eq!(atempo_chain(3.0), "atempo=2.0,atempo=1.5000");
    }
}
