// Library exports for reuse by the CLI and other front-ends
pub mod cli;
pub mod config;
pub mod config_file;
pub mod dithering;
pub mod encode;
pub mod error;
pub mod frame;
pub mod json_output;
pub mod pipeline;
pub mod resize;
pub mod sink;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use config::{DitherConfig, DitherSettings, Method};
pub use dithering::ChannelDispatcher;
pub use error::{DitherError, FrameError};
pub use frame::Frame;
pub use json_output::{JsonMessage, JsonReporter};
pub use pipeline::{
    CancelToken, FrameSink, FrameSource, Pipeline, PipelineEvent, PipelineSummary,
};
pub use sink::PngSequenceSink;
pub use source::{open_source, FfmpegFrameSource, ImageSequenceSource};
