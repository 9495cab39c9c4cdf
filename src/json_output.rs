//! JSON output for GUI integration
//!
//! When --json-progress flag is enabled, all progress and status information
//! is emitted as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::DitherSettings;

/// Minimum gap between two progress lines (~25 updates per second)
const PROGRESS_INTERVAL: Duration = Duration::from_millis(40);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Run accepted, processing about to start
    Started {
        input_path: String,
        output_dir: String,
        settings: DitherSettings,
    },
    /// Progress update
    Progress {
        current: usize,
        total: Option<usize>,
        message: String,
    },
    /// One frame written to the sink
    FrameWritten { index: usize, output_path: String },
    /// Run aborted
    Failed { error: String, frame: Option<usize> },
    /// Processing summary
    Summary {
        frames_written: usize,
        duration_secs: f64,
        stopped_early: bool,
        video_path: Option<String>,
    },
}

impl JsonMessage {
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_line() {
            println!("{}", json);
        }
    }
}

/// Emits throttled progress lines for one run
#[derive(Debug)]
pub struct JsonReporter {
    total: Option<usize>,
    last_progress: Option<Instant>,
}

impl JsonReporter {
    pub fn new(total: Option<usize>) -> Self {
        Self {
            total,
            last_progress: None,
        }
    }

    /// Progress message for `current` completed frames, or `None` when it
    /// falls inside the throttle window.
    ///
    /// The final update (current == total) is never throttled.
    pub fn progress_message(&mut self, current: usize, now: Instant) -> Option<JsonMessage> {
        let is_final = self.total == Some(current);
        let due = self
            .last_progress
            .map_or(true, |last| now.duration_since(last) >= PROGRESS_INTERVAL);

        if !(due || is_final) {
            return None;
        }

        self.last_progress = Some(now);
        Some(JsonMessage::Progress {
            current,
            total: self.total,
            message: format!("Dithered frame {}", current),
        })
    }

    pub fn progress(&mut self, current: usize) {
        if let Some(message) = self.progress_message(current, Instant::now()) {
            message.emit();
        }
    }
}
