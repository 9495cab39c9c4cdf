use thiserror::Error;

use crate::config::Method;

/// Errors raised by the frame source and sink collaborators.
///
/// These carry no frame index of their own; the pipeline attaches the index
/// and the active method when it surfaces them as a [`DitherError`].
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("resize error: {0}")]
    Resize(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DitherError {
    #[error("Invalid configuration: {parameter} {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    #[error(
        "Unsupported dithering method '{0}'. Valid methods: floyd_steinberg, atkinson, jarvis_judice_ninke, ordered, random"
    )]
    UnsupportedMethod(String),

    #[error("Failed to decode frame {index} ({method} dithering): {source}")]
    Decode {
        index: usize,
        method: Method,
        #[source]
        source: FrameError,
    },

    #[error("Failed to write frame {index} ({method} dithering): {source}")]
    Write {
        index: usize,
        method: Method,
        #[source]
        source: FrameError,
    },
}

impl DitherError {
    pub(crate) fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Index of the frame the error is attached to, if any.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            Self::Decode { index, .. } | Self::Write { index, .. } => Some(*index),
            _ => None,
        }
    }
}
