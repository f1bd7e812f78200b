use std::path::Path;
use std::process::Command;

use rand::Rng;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::media;
use crate::tts::NarrationAsset;

pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;
const OUTPUT_FPS: u32 = 60;

/// Integer crop window centered in the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// 9:16 center crop: whichever dimension is too wide for the portrait
/// ratio is trimmed symmetrically; nothing is letterboxed.
pub fn crop_box(width: u32, height: u32) -> CropBox {
    if width * 16 > height * 9 {
        let cropped_width = height * 9 / 16;
        CropBox {
            width: cropped_width,
            height,
            x: (width - cropped_width) / 2,
            y: 0,
        }
    } else {
        let cropped_height = width * 16 / 9;
        CropBox {
            width,
            height: cropped_height,
            x: 0,
            y: (height - cropped_height) / 2,
        }
    }
}

/// Extra input iterations needed so the looped background covers the
/// narration. Zero when the clip is already long enough.
pub fn loop_count(native_seconds: f64, target_seconds: f64) -> u32 {
    if native_seconds >= target_seconds {
        0
    } else {
        (target_seconds / native_seconds).ceil() as u32 - 1
    }
}

/// Renders the final video: background looped or trimmed to the narration
/// length, center-cropped to 9:16, scaled to 1080x1920, subtitles burned
/// in, narration mapped as the only audio track.
pub fn compose(
    background: &Path,
    narration: &NarrationAsset,
    subtitles: &Path,
    out_path: &Path,
) -> Result<()> {
    if !background.exists() {
        return Err(comp_msg(format!(
            "background video not found: {}",
            background.display()
        )));
    }

    let target = narration.duration_seconds;
    let native = media::probe_duration(background).map_err(|e| comp_msg(e.to_string()))?;
    let (width, height) = media::probe_dimensions(background).map_err(|e| comp_msg(e.to_string()))?;
    let crop = crop_box(width, height);
    debug!(
        "Background {}x{} ({:.2}s) cropped to {}x{} at +{}+{}",
        width, height, native, crop.width, crop.height, crop.x, crop.y
    );

    let loops = loop_count(native, target);
    // Random offset only when the clip already covers the narration;
    // looped reads start at zero so the loop count is sufficient.
    let slack = native - target;
    let offset = if loops == 0 && slack > 0.0 {
        rand::thread_rng().gen_range(0.0..slack)
    } else {
        0.0
    };
    if loops > 0 {
        info!(
            "Background shorter than narration ({:.2}s < {:.2}s); looping {} extra times",
            native,
            target,
            loops
        );
    } else {
        info!("Using background subclip starting at {:.2}s", offset);
    }

    let filter = format!(
        "crop={}:{}:{}:{},scale={}:{},subtitles={}:force_style='Fontsize=28,OutlineColour=&H000000&,Outline=3,Shadow=0'",
        crop.width,
        crop.height,
        crop.x,
        crop.y,
        OUTPUT_WIDTH,
        OUTPUT_HEIGHT,
        subtitles.display()
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    if loops > 0 {
        cmd.args(["-stream_loop", &loops.to_string()]);
    }
    if offset > 0.0 {
        cmd.args(["-ss", &format!("{offset:.3}")]);
    }
    cmd.arg("-i").arg(background);
    cmd.arg("-i").arg(&narration.path);
    cmd.args(["-vf", &filter]);
    cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
    cmd.args(["-c:v", "libx264", "-c:a", "aac"]);
    cmd.args(["-r", &OUTPUT_FPS.to_string()]);
    cmd.args(["-t", &format!("{target:.3}"), "-shortest"]);
    cmd.arg(out_path);

    info!("Rendering {:.2}s video to {}", target, out_path.display());
    let status = cmd
        .status()
        .map_err(|e| comp_msg(format!("failed to run ffmpeg: {e}")))?;
    if !status.success() {
        return Err(comp_msg(
            "ffmpeg exited with an error while rendering the final video".to_string(),
        ));
    }
    Ok(())
}

fn comp_msg(msg: String) -> PipelineError {
    PipelineError::CompositionFailed(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_frame_is_cropped_horizontally_about_center() {
        let crop = crop_box(1920, 1080);
        assert_eq!(
            crop,
            CropBox {
                width: 607,
                height: 1080,
                x: 656,
                y: 0
            }
        );
        // Symmetric within integer truncation.
        assert!(1920 - (crop.x + crop.width) - crop.x <= 1);
    }

    #[test]
    fn tall_frame_is_cropped_vertically() {
        let crop = crop_box(1080, 2400);
        assert_eq!(
            crop,
            CropBox {
                width: 1080,
                height: 1920,
                x: 0,
                y: 240
            }
        );
    }

    #[test]
    fn exact_portrait_frame_is_untouched() {
        let crop = crop_box(1080, 1920);
        assert_eq!(
            crop,
            CropBox {
                width: 1080,
                height: 1920,
                x: 0,
                y: 0
            }
        );
    }

    #[test]
    fn short_background_loops_enough_to_cover_narration() {
        // A 10s background under a 35s narration needs 4 total passes.
        assert_eq!(loop_count(10.0, 35.0), 3);
        assert_eq!(loop_count(10.0, 30.0), 2);
        assert_eq!(loop_count(10.0, 10.5), 1);
    }

    #[test]
    fn long_background_never_loops() {
        assert_eq!(loop_count(35.0, 10.0), 0);
        assert_eq!(loop_count(10.0, 10.0), 0);
    }
}
