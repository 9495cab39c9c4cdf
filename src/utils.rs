use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::cli::Args;

/// Create a styled progress bar
///
/// Without a known frame count a spinner with a running counter is used.
pub fn create_progress_bar(total: Option<usize>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.blue} [{elapsed_precise}] {pos} frames {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Frames per second over `elapsed`, 0 when nothing measurable elapsed
pub fn frames_per_second(frames: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if frames == 0 || secs == 0.0 {
        0.0
    } else {
        frames as f64 / secs
    }
}

/// Validate command line arguments that the dithering settings do not cover
pub fn validate_inputs(args: &Args) -> Result<()> {
    let input = args
        .input
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No input given. Pass a video file or image directory"))?;

    if !input.exists() {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            input.display()
        ));
    }
    if !input.is_dir() && !input.is_file() {
        return Err(anyhow::anyhow!(
            "Input path is neither a file nor a directory: {}",
            input.display()
        ));
    }

    if args.output_dir.is_file() {
        return Err(anyhow::anyhow!(
            "Output path is a file, expected a directory: {}",
            args.output_dir.display()
        ));
    }

    // Validate job count
    if args.jobs > 256 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 256), got: {}",
            args.jobs
        ));
    }

    Ok(())
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[&str]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext.as_str())
    } else {
        false
    }
}

/// Print verbose message if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}
