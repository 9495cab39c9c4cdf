//! Frame sources: a video decoded through an `ffmpeg` pipe, or a directory of
//! still images read in name order.

use image::RgbImage;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

use crate::error::FrameError;
use crate::pipeline::FrameSource;
use crate::utils::has_valid_extension;

/// Still image formats accepted as sequence frames
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tiff", "webp"];

/// Pick a source for `input`: a directory or a single still image becomes an
/// image sequence, anything else is handed to ffmpeg.
pub fn open_source(input: &Path) -> Result<Box<dyn FrameSource>, FrameError> {
    if input.is_dir() {
        Ok(Box::new(ImageSequenceSource::open(input)?))
    } else if has_valid_extension(input, &IMAGE_EXTENSIONS) {
        Ok(Box::new(ImageSequenceSource::from_files(vec![
            input.to_path_buf(),
        ])))
    } else {
        Ok(Box::new(FfmpegFrameSource::open(input)?))
    }
}

/// Still images from a directory, one frame per file, sorted by file name
#[derive(Debug)]
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, FrameError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.map_err(|e| FrameError::Decode(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && has_valid_extension(path, &IMAGE_EXTENSIONS) {
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            return Err(FrameError::Decode(format!(
                "no image files found in {}",
                dir.display()
            )));
        }

        files.sort();
        Ok(Self::from_files(files))
    }

    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self { files, position: 0 }
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        let img = image::open(path)
            .map_err(|e| FrameError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Some(img.to_rgb8()))
    }

    fn frame_count_hint(&self) -> Option<usize> {
        Some(self.files.len())
    }
}

/// Stream geometry reported by ffprobe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
}

/// Parse `ffprobe -of json` output for the first video stream
pub fn parse_probe(json: &str) -> Result<VideoInfo, FrameError> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| FrameError::Decode(format!("unreadable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| FrameError::Decode("input has no video stream".to_string()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok(VideoInfo {
            width,
            height,
            frame_count: stream
                .nb_frames
                .and_then(|n| n.parse().ok())
                .filter(|&n| n > 0),
        }),
        _ => Err(FrameError::Decode(
            "video stream has no usable dimensions".to_string(),
        )),
    }
}

pub fn probe_video(input: &Path) -> Result<VideoInfo, FrameError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height,nb_frames"])
        .args(["-of", "json"])
        .arg(input)
        .output()
        .map_err(|e| FrameError::Decode(format!("cannot run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FrameError::Decode(format!(
            "ffprobe failed on {}: {}",
            input.display(),
            stderr.trim()
        )));
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Video frames decoded by an `ffmpeg` child process into raw RGB24
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    info: VideoInfo,
    finished: bool,
}

impl FfmpegFrameSource {
    pub fn open(input: &Path) -> Result<Self, FrameError> {
        if !input.is_file() {
            return Err(FrameError::Decode(format!(
                "input file not found: {}",
                input.display()
            )));
        }

        let info = probe_video(input)?;

        let mut child = Command::new("ffmpeg")
            .args(["-loglevel", "error", "-nostdin", "-i"])
            .arg(input)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FrameError::Decode(format!("cannot run ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FrameError::Decode("ffmpeg stdout unavailable".to_string()))?;

        // ffmpeg blocks once a full stderr pipe goes unread
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut log = String::new();
                let _ = pipe.read_to_string(&mut log);
                log
            })
        });

        Ok(Self {
            child,
            stdout,
            stderr,
            info,
            finished: false,
        })
    }
}

/// Wait for the decoder and collect its log, failing on a non-zero exit
fn reap_decoder(
    child: &mut Child,
    stderr: &mut Option<JoinHandle<String>>,
) -> Result<(), FrameError> {
    let status = child.wait()?;
    let log = stderr
        .take()
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    decoder_exit(status.success(), &status.to_string(), &log)
}

fn decoder_exit(success: bool, status: &str, log: &str) -> Result<(), FrameError> {
    if success {
        return Ok(());
    }
    let log = log.trim();
    if log.is_empty() {
        Err(FrameError::Decode(format!("ffmpeg exited with {}", status)))
    } else {
        Err(FrameError::Decode(format!("ffmpeg exited with {}: {}", status, log)))
    }
}

/// Pull one raw RGB24 frame of `info` geometry off `reader`.
///
/// `finish` runs once the stream ends. A clean end on a frame boundary is the
/// end of input unless the decoder failed; a partial frame is always an error
/// and carries whatever the decoder reported.
fn read_raw_frame<R, F>(
    reader: &mut R,
    info: VideoInfo,
    finish: F,
) -> Result<Option<RgbImage>, FrameError>
where
    R: Read,
    F: FnOnce() -> Result<(), FrameError>,
{
    let mut buffer = vec![0u8; info.width as usize * info.height as usize * 3];
    let filled = read_full(reader, &mut buffer)?;

    if filled == 0 {
        finish()?;
        return Ok(None);
    }
    if filled < buffer.len() {
        let cause = match finish() {
            Ok(()) => String::new(),
            Err(FrameError::Decode(reason)) => format!(" ({})", reason),
            Err(e) => format!(" ({})", e),
        };
        return Err(FrameError::Decode(format!(
            "truncated frame: got {} of {} bytes{}",
            filled,
            buffer.len(),
            cause
        )));
    }

    RgbImage::from_raw(info.width, info.height, buffer)
        .map(Some)
        .ok_or_else(|| FrameError::Decode("frame buffer size mismatch".to_string()))
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError> {
        if self.finished {
            return Ok(None);
        }

        let child = &mut self.child;
        let stderr = &mut self.stderr;
        let finished = &mut self.finished;
        read_raw_frame(&mut self.stdout, self.info, || {
            *finished = true;
            reap_decoder(child, stderr)
        })
    }

    fn frame_count_hint(&self) -> Option<usize> {
        self.info.frame_count
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_sequence_reads_in_name_order() {
        let dir = TempDir::new().unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("c.bmp", 30)] {
            RgbImage::from_pixel(4, 3, Rgb([value, value, value]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.frame_count_hint(), Some(3));

        let values: Vec<u8> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|img| img.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(values, vec![10, 20, 30]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let err = ImageSequenceSource::open(dir.path()).unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }

    #[test]
    fn test_corrupt_image_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("frame.png"), b"not a png").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let err = source.next_frame().unwrap_err();
        assert!(err.to_string().contains("frame.png"));
    }

    #[test]
    fn test_single_image_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("still.png");
        RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut source = open_source(&path).unwrap();
        assert_eq!(source.frame_count_hint(), Some(1));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_parse_probe() {
        let info = parse_probe(
            r#"{"programs": [], "streams": [{"width": 1920, "height": 1080, "nb_frames": "300"}]}"#,
        )
        .unwrap();
        assert_eq!(
            info,
            VideoInfo {
                width: 1920,
                height: 1080,
                frame_count: Some(300)
            }
        );

        let info = parse_probe(r#"{"streams": [{"width": 640, "height": 360}]}"#).unwrap();
        assert_eq!(info.frame_count, None);

        assert!(parse_probe(r#"{"streams": []}"#).is_err());
        assert!(parse_probe(r#"{"streams": [{"width": 0, "height": 360}]}"#).is_err());
        assert!(parse_probe("garbage").is_err());
    }

    #[test]
    fn test_read_full_reports_short_reads() {
        let data = vec![7u8; 10];
        let mut buf = [0u8; 16];
        assert_eq!(read_full(&mut data.as_slice(), &mut buf).unwrap(), 10);

        let mut empty: &[u8] = &[];
        assert_eq!(read_full(&mut empty, &mut buf).unwrap(), 0);
    }

    fn geometry(width: u32, height: u32) -> VideoInfo {
        VideoInfo {
            width,
            height,
            frame_count: None,
        }
    }

    #[test]
    fn test_raw_frames_end_cleanly_on_frame_boundary() {
        let mut bytes: Vec<u8> = (0..12).collect();
        bytes.extend(std::iter::repeat(200).take(12));
        let mut reader = bytes.as_slice();
        let mut finished = 0;

        let first = read_raw_frame(&mut reader, geometry(2, 2), || Ok(())).unwrap();
        assert_eq!(first.unwrap().get_pixel(1, 0), &Rgb([3, 4, 5]));
        let second = read_raw_frame(&mut reader, geometry(2, 2), || Ok(())).unwrap();
        assert_eq!(second.unwrap().get_pixel(1, 1), &Rgb([200, 200, 200]));

        let end = read_raw_frame(&mut reader, geometry(2, 2), || {
            finished += 1;
            Ok(())
        })
        .unwrap();
        assert!(end.is_none());
        assert_eq!(finished, 1);
    }

    #[test]
    fn test_partial_raw_frame_reports_decoder_failure() {
        let bytes = vec![9u8; 7];
        let err = read_raw_frame(&mut bytes.as_slice(), geometry(2, 2), || {
            decoder_exit(false, "exit status: 1", "Invalid data found when processing input\n")
        })
        .unwrap_err();

        assert!(matches!(err, FrameError::Decode(_)));
        let message = err.to_string();
        assert!(message.contains("got 7 of 12 bytes"), "{}", message);
        assert!(message.contains("exit status: 1"), "{}", message);
        assert!(message.contains("Invalid data found"), "{}", message);
    }

    #[test]
    fn test_partial_raw_frame_after_clean_exit() {
        let bytes = vec![9u8; 5];
        let err = read_raw_frame(&mut bytes.as_slice(), geometry(2, 2), || Ok(())).unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
        assert!(err.to_string().ends_with("got 5 of 12 bytes"));
    }

    #[test]
    fn test_failed_decoder_exit_is_a_decode_error() {
        let mut empty: &[u8] = &[];
        let err = read_raw_frame(&mut empty, geometry(2, 2), || {
            decoder_exit(false, "exit status: 1", "moov atom not found")
        })
        .unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
        assert!(err.to_string().contains("moov atom not found"));

        assert!(decoder_exit(true, "exit status: 0", "").is_ok());
        let err = decoder_exit(false, "signal: 9", "  ").unwrap_err();
        assert_eq!(err.to_string(), "decode error: ffmpeg exited with signal: 9");
    }

    #[test]
    fn test_missing_video_file() {
        let dir = TempDir::new().unwrap();
        let err = FfmpegFrameSource::open(&dir.path().join("missing.mp4")).err();
        assert!(matches!(err, Some(FrameError::Decode(_))));
    }
}
