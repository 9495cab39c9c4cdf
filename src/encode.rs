//! Hand-off to `ffmpeg` for assembling written frames into an H.264 video.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::DitherConfig;
use crate::sink::FRAME_PATTERN;

/// Check if ffmpeg is available on the system
pub fn is_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Default video file name for a run, e.g. `output_dithered_atkinson_color.mp4`
pub fn default_video_name(config: &DitherConfig) -> PathBuf {
    PathBuf::from(format!("output_dithered_{}.mp4", config.label()))
}

fn encoder_args(frames_dir: &Path, fps: u32, output: &Path) -> Vec<String> {
    vec![
        "-r".to_string(),
        fps.to_string(),
        "-i".to_string(),
        frames_dir.join(FRAME_PATTERN).display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}

/// Command line a user can run to turn the frame directory into a video
pub fn suggested_command(frames_dir: &Path, config: &DitherConfig) -> String {
    let args = encoder_args(frames_dir, config.fps(), &default_video_name(config));
    format!("ffmpeg {}", args.join(" "))
}

/// Run ffmpeg over the written frames, overwriting `output` if it exists
pub fn assemble_video(frames_dir: &Path, fps: u32, output: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .args(["-loglevel", "error", "-y"])
        .args(encoder_args(frames_dir, fps, output))
        .output()
        .context("Failed to run ffmpeg")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(anyhow::anyhow!("ffmpeg failed: {}", stderr.trim()));
    }

    Ok(())
}
