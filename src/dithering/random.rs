//! Random threshold dithering
//!
//! Each pixel is compared against 128 plus a uniform offset in
//! [-variance, +variance]. Every (frame, channel) pass gets its own RNG stream
//! derived from the run seed, so results do not depend on processing order.
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::quantize::{threshold_level, MID_THRESHOLD};

/// Default threshold variance, in sample units
pub const DEFAULT_VARIANCE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomThreshold {
    pub variance: f32,
    pub seed: u64,
}

impl RandomThreshold {
    pub fn new(variance: f32, seed: u64) -> Self {
        Self { variance, seed }
    }

    /// Independent, reproducible stream for one channel pass of one frame
    pub fn rng_for(&self, frame_index: usize, channel: usize) -> StdRng {
        let stream = mix(
            self.seed ^ mix(frame_index as u64).wrapping_add(channel as u64),
        );
        StdRng::seed_from_u64(stream)
    }
}

/// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn random_channel<R: Rng>(plane: &GrayImage, variance: f32, rng: &mut R) -> GrayImage {
    let (width, height) = plane.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in plane.enumerate_pixels() {
        // Scaling a unit draw keeps huge variances finite
        let offset = if variance > 0.0 {
            rng.random_range(-1.0f32..=1.0) * variance
        } else {
            0.0
        };
        let threshold = (MID_THRESHOLD + offset).clamp(0.0, 255.0);
        output.put_pixel(x, y, Luma([threshold_level(pixel[0] as f32, threshold)]));
    }

    output
}
