use image::{GrayImage, RgbImage};

use super::diffusion::{
    diffuse_channel, DiffusionKernel, ErrorBuffer, ATKINSON, FLOYD_STEINBERG, JARVIS_JUDICE_NINKE,
};
use super::ordered::{ordered_channel, BayerMatrix};
use super::random::{random_channel, RandomThreshold};
use crate::config::{DitherConfig, Method};
use crate::error::DitherError;
use crate::frame::{extract_channel, merge_channels, to_luma, Frame};

/// The five methods reduced to the three engines that implement them
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    Diffusion {
        kernel: &'static DiffusionKernel,
        strength: f32,
    },
    Ordered(&'static BayerMatrix),
    Random(RandomThreshold),
}

impl Algorithm {
    pub fn from_config(config: &DitherConfig) -> Result<Self, DitherError> {
        let diffusion = |kernel: &'static DiffusionKernel| Algorithm::Diffusion {
            kernel,
            strength: config.strength(),
        };

        Ok(match config.method() {
            Method::FloydSteinberg => diffusion(&FLOYD_STEINBERG),
            Method::Atkinson => diffusion(&ATKINSON),
            Method::JarvisJudiceNinke => diffusion(&JARVIS_JUDICE_NINKE),
            Method::Ordered => {
                let matrix = BayerMatrix::for_size(config.matrix_size()).ok_or_else(|| {
                    DitherError::configuration(
                        "matrix_size",
                        format!("must be one of 2, 4, 8 (got {})", config.matrix_size()),
                    )
                })?;
                Algorithm::Ordered(matrix)
            }
            Method::Random => Algorithm::Random(RandomThreshold::new(
                config.threshold_variance(),
                config.seed(),
            )),
        })
    }

    /// Run one channel pass. `scratch` is only touched by diffusion.
    pub fn apply(
        &self,
        plane: &GrayImage,
        frame_index: usize,
        channel: usize,
        scratch: &mut ErrorBuffer,
    ) -> GrayImage {
        match self {
            Algorithm::Diffusion { kernel, strength } => {
                diffuse_channel(plane, kernel, *strength, scratch)
            }
            Algorithm::Ordered(matrix) => ordered_channel(plane, matrix),
            Algorithm::Random(random) => {
                let mut rng = random.rng_for(frame_index, channel);
                random_channel(plane, random.variance, &mut rng)
            }
        }
    }
}

/// Routes a frame through the selected engine once per channel
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    algorithm: Algorithm,
    color: bool,
}

impl ChannelDispatcher {
    pub fn new(config: &DitherConfig) -> Result<Self, DitherError> {
        Ok(Self {
            algorithm: Algorithm::from_config(config)?,
            color: config.is_color(),
        })
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Dither one decoded frame.
    ///
    /// Grayscale: one pass over the luma plane. Color: one independent pass
    /// per R, G, B channel, each starting from a clean error buffer.
    pub fn dither(&self, img: &RgbImage, frame_index: usize, scratch: &mut ErrorBuffer) -> Frame {
        if !self.color {
            let luma = to_luma(img);
            return Frame::Gray(self.algorithm.apply(&luma, frame_index, 0, scratch));
        }

        let [r, g, b] = [0, 1, 2].map(|channel| {
            let plane = extract_channel(img, channel);
            self.algorithm.apply(&plane, frame_index, channel, scratch)
        });
        Frame::Rgb(merge_channels(&r, &g, &b))
    }
}
