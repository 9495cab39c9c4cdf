//! Frame pipeline: decode, resize, dither, write.
//!
//! Frames are always handed to the sink in strictly increasing index order.
//! With `jobs > 1` frames are read in batches and dithered on a dedicated
//! rayon pool, but writing stays sequential.

use image::RgbImage;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DitherConfig;
use crate::dithering::{ChannelDispatcher, ErrorBuffer};
use crate::error::{DitherError, FrameError};
use crate::frame::Frame;
use crate::resize::resize_frame;

/// Frames dithered per parallel batch, per worker thread
const FRAMES_PER_WORKER: usize = 2;

/// Produces decoded RGB frames in order. `Ok(None)` marks end of input.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError>;

    /// Total frames the source expects to yield, when known up front
    fn frame_count_hint(&self) -> Option<usize> {
        None
    }
}

/// Persists dithered frames.
pub trait FrameSink {
    fn write_frame(&mut self, index: usize, frame: &Frame) -> Result<(), FrameError>;
}

/// Cooperative stop flag, checked before each frame is read
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Frame `index` has been dithered and accepted by the sink
    FrameWritten { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub frames_written: usize,
    pub elapsed: Duration,
    /// True when the run stopped because of a cancellation request
    pub stopped_early: bool,
}

pub struct Pipeline {
    config: DitherConfig,
    dispatcher: ChannelDispatcher,
    pool: Option<ThreadPool>,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: &DitherConfig) -> Result<Self, DitherError> {
        let dispatcher = ChannelDispatcher::new(config)?;

        let pool = if config.jobs() > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.jobs())
                .thread_name(|i| format!("dither-{}", i))
                .build()
                .map_err(|e| {
                    DitherError::configuration("jobs", format!("cannot start worker pool: {}", e))
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            dispatcher,
            pool,
            cancel: CancelToken::new(),
        })
    }

    /// Replace the pipeline's cancel token with one shared by the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Frames this run will produce if the source ends where it says it will
    pub fn expected_frames<S: FrameSource + ?Sized>(&self, source: &S) -> Option<usize> {
        match (source.frame_count_hint(), self.config.frame_limit()) {
            (Some(hint), Some(limit)) => Some(hint.min(limit)),
            (Some(hint), None) => Some(hint),
            (None, limit) => limit,
        }
    }

    /// Drive `source` to completion (or the frame limit) and write every
    /// dithered frame to `sink`.
    ///
    /// A decode or write failure aborts the run; frames already written stay
    /// written. Cancellation is not an error.
    pub fn run<S, K, F>(
        &self,
        source: &mut S,
        sink: &mut K,
        mut on_event: F,
    ) -> Result<PipelineSummary, DitherError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
        F: FnMut(PipelineEvent),
    {
        let start = Instant::now();
        let (frames_written, stopped_early) = match &self.pool {
            Some(pool) => self.run_batched(pool, source, sink, &mut on_event)?,
            None => self.run_sequential(source, sink, &mut on_event)?,
        };

        Ok(PipelineSummary {
            frames_written,
            elapsed: start.elapsed(),
            stopped_early,
        })
    }

    fn run_sequential<S, K, F>(
        &self,
        source: &mut S,
        sink: &mut K,
        on_event: &mut F,
    ) -> Result<(usize, bool), DitherError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
        F: FnMut(PipelineEvent),
    {
        let mut scratch = ErrorBuffer::with_dimensions(self.config.width(), self.config.height());
        let mut index = 0;

        while !self.limit_reached(index) {
            if self.cancel.is_cancelled() {
                return Ok((index, true));
            }

            let Some(decoded) = source
                .next_frame()
                .map_err(|e| self.decode_error(index, e))?
            else {
                break;
            };

            let frame = self.process(&decoded, index, &mut scratch)?;
            self.write(sink, index, &frame)?;
            on_event(PipelineEvent::FrameWritten { index });
            index += 1;
        }

        Ok((index, false))
    }

    fn run_batched<S, K, F>(
        &self,
        pool: &ThreadPool,
        source: &mut S,
        sink: &mut K,
        on_event: &mut F,
    ) -> Result<(usize, bool), DitherError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
        F: FnMut(PipelineEvent),
    {
        let batch_size = self.config.jobs() * FRAMES_PER_WORKER;
        let (width, height) = (self.config.width(), self.config.height());
        let mut next_index = 0;

        loop {
            let mut batch = Vec::with_capacity(batch_size);
            let mut pending_error = None;
            let mut cancelled = false;
            let mut exhausted = false;

            while batch.len() < batch_size {
                let index = next_index + batch.len();
                if self.limit_reached(index) {
                    exhausted = true;
                    break;
                }
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                match source.next_frame() {
                    Ok(Some(decoded)) => batch.push((index, decoded)),
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => {
                        pending_error = Some(self.decode_error(index, e));
                        break;
                    }
                }
            }

            let dithered: Vec<Result<Frame, DitherError>> = pool.install(|| {
                batch
                    .par_iter()
                    .map_init(
                        || ErrorBuffer::with_dimensions(width, height),
                        |scratch, (index, decoded)| self.process(decoded, *index, scratch),
                    )
                    .collect()
            });

            for (frame, (index, _)) in dithered.into_iter().zip(&batch) {
                self.write(sink, *index, &frame?)?;
                on_event(PipelineEvent::FrameWritten { index: *index });
            }
            next_index += batch.len();

            if let Some(err) = pending_error {
                return Err(err);
            }
            if cancelled {
                return Ok((next_index, true));
            }
            if exhausted {
                return Ok((next_index, false));
            }
        }
    }

    fn limit_reached(&self, index: usize) -> bool {
        self.config.frame_limit().is_some_and(|limit| index >= limit)
    }

    /// Resize to the configured output size and dither one frame
    fn process(
        &self,
        decoded: &RgbImage,
        index: usize,
        scratch: &mut ErrorBuffer,
    ) -> Result<Frame, DitherError> {
        let resized = resize_frame(decoded, self.config.width(), self.config.height())
            .map_err(|e| self.decode_error(index, e))?;
        Ok(self.dispatcher.dither(&resized, index, scratch))
    }

    fn write<K: FrameSink + ?Sized>(
        &self,
        sink: &mut K,
        index: usize,
        frame: &Frame,
    ) -> Result<(), DitherError> {
        sink.write_frame(index, frame)
            .map_err(|source| DitherError::Write {
                index,
                method: self.config.method(),
                source,
            })
    }

    fn decode_error(&self, index: usize, source: FrameError) -> DitherError {
        DitherError::Decode {
            index,
            method: self.config.method(),
            source,
        }
    }
}
