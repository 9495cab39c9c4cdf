use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FrameError;
use crate::frame::Frame;
use crate::pipeline::FrameSink;

/// Name of the PNG written for frame `index`
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:04}.png", index)
}

/// `ffmpeg` input pattern matching [`frame_file_name`]
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// Writes each frame as `frame_NNNN.png` in an output directory
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    rgb_output: bool,
    written: usize,
}

impl PngSequenceSink {
    /// Create the output directory if needed.
    ///
    /// A directory that already holds `frame_*.png` files is refused unless
    /// `overwrite` is set, so a previous run is never silently mixed with a
    /// new one.
    pub fn create(dir: &Path, overwrite: bool) -> Result<Self, FrameError> {
        fs::create_dir_all(dir).map_err(|e| {
            FrameError::Write(format!("cannot create {}: {}", dir.display(), e))
        })?;

        if !overwrite {
            let existing = existing_frames(dir)?;
            if existing > 0 {
                return Err(FrameError::Write(format!(
                    "{} already contains {} frame file(s); use --force to overwrite",
                    dir.display(),
                    existing
                )));
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            rgb_output: false,
            written: 0,
        })
    }

    /// Always write 3-channel PNGs, replicating grayscale frames
    pub fn with_rgb_output(mut self, rgb_output: bool) -> Self {
        self.rgb_output = rgb_output;
        self
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }
}

impl FrameSink for PngSequenceSink {
    fn write_frame(&mut self, index: usize, frame: &Frame) -> Result<(), FrameError> {
        let path = self.frame_path(index);
        let result = match frame {
            Frame::Gray(img) if !self.rgb_output => img.save_with_format(&path, ImageFormat::Png),
            Frame::Gray(_) => frame.to_rgb().save_with_format(&path, ImageFormat::Png),
            Frame::Rgb(img) => img.save_with_format(&path, ImageFormat::Png),
        };
        result.map_err(|e| FrameError::Write(format!("{}: {}", path.display(), e)))?;

        self.written += 1;
        Ok(())
    }
}

/// Count `frame_*.png` files directly inside `dir`
fn existing_frames(dir: &Path) -> Result<usize, FrameError> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("frame_") && name.ends_with(".png") {
            count += 1;
        }
    }
    Ok(count)
}
