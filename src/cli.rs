use clap::Parser;
use std::path::PathBuf;

use crate::config::DitherSettings;

#[derive(Parser, Debug)]
#[command(
    name = "video-dither",
    version,
    about = "Retro black & white or per-channel dithering for video frames",
    long_about = "
Video Dither - frame-by-frame dithering for video

Decodes a video (through ffmpeg) or a directory of still images, scales every
frame to the target size, reduces it to pure black and white with one of five
dithering methods and writes the result as a numbered PNG sequence. In color
mode the red, green and blue channels are dithered independently, giving an
8-color look.

Methods:
  floyd_steinberg      error diffusion, best gradients
  atkinson             error diffusion, lighter with crisp highlights
  jarvis_judice_ninke  wide error diffusion, smoothest
  ordered              Bayer matrix (2x2, 4x4 or 8x8), stable crosshatch
  random               random threshold noise

Example Usage:
  # Grayscale Floyd-Steinberg, first 720 frames at 540x960
  video-dither input.mp4

  # Color Atkinson into a custom directory, all frames
  video-dither input.mp4 -o out -m atkinson --color --frames 0

  # Ordered 8x8 at 1080x1920, then assemble the video
  video-dither input.mp4 -m ordered --matrix-size 8 -w 1080 --height 1920 \\
    --encode dithered.mp4

  # Reproducible random dithering on 8 threads
  video-dither input.mp4 -m random --threshold-variance 80 --seed 42 -j 8"
)]
pub struct Args {
    /// Input video file, single image, or directory of images
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output directory for the PNG frames
    #[arg(short = 'o', long = "output", default_value = "frames", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Dithering method
    #[arg(
        short = 'm',
        long = "method",
        default_value = "floyd_steinberg",
        value_name = "METHOD",
        help = "Dithering method: floyd_steinberg, atkinson, jarvis_judice_ninke, ordered, random"
    )]
    pub method: String,

    /// Output frame width in pixels
    #[arg(short = 'w', long = "width", default_value = "540", value_name = "PIXELS")]
    pub width: u32,

    /// Output frame height in pixels
    #[arg(long = "height", default_value = "960", value_name = "PIXELS")]
    pub height: u32,

    /// Maximum number of frames to process (0 = all)
    #[arg(short = 'f', long = "frames", default_value = "720", value_name = "N")]
    pub frames: usize,

    /// Dither R, G and B independently instead of the luminance
    #[arg(short = 'c', long = "color")]
    pub color: bool,

    /// Fraction of the quantization error diffused to neighbours (0.0-1.0)
    #[arg(
        short = 'd',
        long = "dither-strength",
        default_value = "1.0",
        value_name = "STRENGTH"
    )]
    pub dither_strength: f32,

    /// Bayer matrix size for ordered dithering (2, 4 or 8)
    #[arg(long = "matrix-size", default_value = "4", value_name = "N")]
    pub matrix_size: usize,

    /// Threshold noise amplitude for random dithering
    #[arg(long = "threshold-variance", default_value = "50.0", value_name = "AMOUNT")]
    pub threshold_variance: f32,

    /// Frame rate used when assembling the output video
    #[arg(long = "fps", default_value = "30", value_name = "FPS")]
    pub fps: u32,

    /// Seed for random dithering (default: a fresh seed per run)
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Number of parallel processing jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "0", value_name = "N")]
    pub jobs: usize,

    /// Write grayscale frames as 3-channel RGB PNGs
    #[arg(long = "rgb-output")]
    pub rgb_output: bool,

    /// Assemble the frames into this video file with ffmpeg when done
    #[arg(long = "encode", value_name = "FILE")]
    pub encode: Option<PathBuf>,

    /// Load settings from a JSON config file (command-line flags take precedence)
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Emit progress as JSON lines on stdout instead of human-readable output
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Overwrite frames left in the output directory by a previous run
    #[arg(long = "force")]
    pub force: bool,
}

impl Args {
    /// Worker count with `0` resolved to the number of CPU cores
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    /// Raw dithering parameters, ready for validation
    pub fn to_settings(&self) -> DitherSettings {
        DitherSettings {
            method: self.method.clone(),
            color: self.color,
            width: self.width,
            height: self.height,
            frame_limit: self.frames,
            strength: self.dither_strength,
            matrix_size: self.matrix_size,
            threshold_variance: self.threshold_variance,
            fps: self.fps,
            seed: self.seed,
            jobs: self.effective_jobs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;

    #[test]
    fn test_defaults_match_settings_defaults() {
        let args = Args::try_parse_from(["video-dither", "input.mp4", "-j", "1"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("input.mp4")));
        assert_eq!(args.output_dir, PathBuf::from("frames"));
        assert_eq!(args.to_settings(), DitherSettings::default());
    }

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "video-dither",
            "clip.mov",
            "-o",
            "out",
            "-m",
            "jarvis-judice-ninke",
            "-w",
            "320",
            "--height",
            "240",
            "-f",
            "0",
            "--color",
            "-d",
            "0.75",
            "--seed",
            "42",
            "-j",
            "3",
            "--encode",
            "clip.mp4",
        ])
        .unwrap();

        assert_eq!(args.encode, Some(PathBuf::from("clip.mp4")));
        let config = args.to_settings().validate().unwrap();
        assert_eq!(config.method(), Method::JarvisJudiceNinke);
        assert!(config.is_color());
        assert_eq!((config.width(), config.height()), (320, 240));
        assert_eq!(config.frame_limit(), None);
        assert_eq!(config.strength(), 0.75);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.jobs(), 3);
    }

    #[test]
    fn test_auto_jobs_uses_cpu_count() {
        let args = Args::try_parse_from(["video-dither", "input.mp4"]).unwrap();
        assert_eq!(args.jobs, 0);
        assert!(args.effective_jobs() >= 1);
    }

    #[test]
    fn test_invalid_number_is_rejected_by_parser() {
        assert!(Args::try_parse_from(["video-dither", "in.mp4", "--matrix-size", "four"]).is_err());
    }
}

// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from("frames"),
            method: "floyd_steinberg".to_string(),
            width: 540,
            height: 960,
            frames: 720,
            color: false,
            dither_strength: 1.0,
            matrix_size: 4,
            threshold_variance: 50.0,
            fps: 30,
            seed: None,
            jobs: 0,
            rgb_output: false,
            encode: None,
            config_file: None,
            json_progress: false,
            verbose: false,
            force: false,
        }
    }
}
