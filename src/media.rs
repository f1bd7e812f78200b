use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Both renderer binaries must be on PATH before any work starts; their
/// absence is a fatal precondition, not something the pipeline can route
/// around.
pub fn require_tools() -> anyhow::Result<()> {
    for tool in ["ffmpeg", "ffprobe"] {
        let found = Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if !found {
            bail!("{tool} not found on PATH; install it before running");
        }
    }
    Ok(())
}

/// Playback length in seconds, measured from the container metadata.
pub fn probe_duration(path: &Path) -> anyhow::Result<f64> {
    let json = run_ffprobe(path, &["-show_entries", "format=duration"])?;
    parse_duration(&json).with_context(|| format!("probing duration of {}", path.display()))
}

/// Frame size of the first video stream.
pub fn probe_dimensions(path: &Path) -> anyhow::Result<(u32, u32)> {
    let json = run_ffprobe(
        path,
        &["-select_streams", "v:0", "-show_entries", "stream=width,height"],
    )?;
    parse_dimensions(&json).with_context(|| format!("probing dimensions of {}", path.display()))
}

fn run_ffprobe(path: &Path, entries: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-of", "json"])
        .args(entries)
        .arg(path)
        .output()
        .context("failed to run ffprobe")?;
    if !output.status.success() {
        bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_duration(json: &str) -> anyhow::Result<f64> {
    let probe: ProbeOutput = serde_json::from_str(json).context("unparsable ffprobe output")?;
    let duration = probe
        .format
        .and_then(|f| f.duration)
        .context("no duration in probe output")?;
    let seconds: f64 = duration.parse().context("unparsable duration value")?;
    if seconds <= 0.0 {
        bail!("non-positive duration {seconds}");
    }
    Ok(seconds)
}

fn parse_dimensions(json: &str) -> anyhow::Result<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_str(json).context("unparsable ffprobe output")?;
    let stream = probe.streams.first().context("no video stream in probe output")?;
    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => bail!("video stream has no usable dimensions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parses_from_format_block() {
        let json = r#"{ "format": { "duration": "12.345000" } }"#;
        assert!((parse_duration(json).unwrap() - 12.345).abs() < 1e-9);
    }

    #[test]
    fn missing_or_bad_duration_is_an_error() {
        assert!(parse_duration(r#"{ "format": {} }"#).is_err());
        assert!(parse_duration(r#"{ "format": { "duration": "abc" } }"#).is_err());
        assert!(parse_duration(r#"{ "format": { "duration": "0.0" } }"#).is_err());
        assert!(parse_duration("not json").is_err());
    }

    #[test]
    fn dimensions_parse_from_first_stream() {
        let json = r#"{ "streams": [ { "width": 1920, "height": 1080 } ] }"#;
        assert_eq!(parse_dimensions(json).unwrap(), (1920, 1080));
    }

    #[test]
    fn missing_dimensions_are_an_error() {
        assert!(parse_dimensions(r#"{ "streams": [] }"#).is_err());
        assert!(parse_dimensions(r#"{ "streams": [ { "width": 1920 } ] }"#).is_err());
        assert!(parse_dimensions(r#"{ "streams": [ { "width": 0, "height": 0 } ] }"#).is_err());
    }
}
