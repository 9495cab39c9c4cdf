//! Kernel-based error diffusion
//!
//! Floyd-Steinberg, Atkinson and Jarvis-Judice-Ninke are all the same scan:
//! quantize the pixel, then push the (strength-scaled) residual onto
//! not-yet-visited neighbours. Only the kernel differs.
use image::{GrayImage, Luma};

use super::quantize::{quantize, MID_THRESHOLD};

/// One neighbour of a diffusion kernel, relative to the current pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub dx: i32,
    pub dy: u32,
    pub weight: f32,
}

const fn tap(dx: i32, dy: u32, weight: f32) -> Tap {
    Tap { dx, dy, weight }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionKernel {
    pub name: &'static str,
    pub taps: &'static [Tap],
    pub divisor: f32,
}

impl DiffusionKernel {
    /// Share of a pixel's error the kernel hands on to its neighbours
    pub fn conserved_fraction(&self) -> f32 {
        self.taps.iter().map(|t| t.weight).sum::<f32>() / self.divisor
    }

    /// Every tap must land on a pixel the row-major scan has not reached yet
    pub fn is_causal(&self) -> bool {
        self.taps.iter().all(|t| t.dy > 0 || t.dx > 0)
    }
}

/// Floyd-Steinberg
///
/// ```text
///          *   7/16
///   3/16  5/16  1/16
/// ```
pub const FLOYD_STEINBERG: DiffusionKernel = DiffusionKernel {
    name: "floyd_steinberg",
    taps: &[tap(1, 0, 7.0), tap(-1, 1, 3.0), tap(0, 1, 5.0), tap(1, 1, 1.0)],
    divisor: 16.0,
};

/// Atkinson: only 6/8 of the error travels, which lightens the output.
///
/// ```text
///          *   1/8  1/8
///   1/8  1/8  1/8
///        1/8
/// ```
pub const ATKINSON: DiffusionKernel = DiffusionKernel {
    name: "atkinson",
    taps: &[
        tap(1, 0, 1.0),
        tap(2, 0, 1.0),
        tap(-1, 1, 1.0),
        tap(0, 1, 1.0),
        tap(1, 1, 1.0),
        tap(0, 2, 1.0),
    ],
    divisor: 8.0,
};

/// Jarvis-Judice-Ninke
///
/// ```text
///                *   7/48  5/48
///   3/48  5/48  7/48  5/48  3/48
///   1/48  3/48  5/48  3/48  1/48
/// ```
pub const JARVIS_JUDICE_NINKE: DiffusionKernel = DiffusionKernel {
    name: "jarvis_judice_ninke",
    taps: &[
        tap(1, 0, 7.0),
        tap(2, 0, 5.0),
        tap(-2, 1, 3.0),
        tap(-1, 1, 5.0),
        tap(0, 1, 7.0),
        tap(1, 1, 5.0),
        tap(2, 1, 3.0),
        tap(-2, 2, 1.0),
        tap(-1, 2, 3.0),
        tap(0, 2, 5.0),
        tap(1, 2, 3.0),
        tap(2, 2, 1.0),
    ],
    divisor: 48.0,
};

/// Pending error for one channel pass.
///
/// Kept around between passes and frames so long videos do not reallocate;
/// [`ErrorBuffer::reset`] zeroes it and adapts it to the next frame size.
#[derive(Debug, Default, Clone)]
pub struct ErrorBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        let mut buffer = Self::new();
        buffer.reset(width, height);
        buffer
    }

    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, 0.0);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[self.index(x, y)]
    }

    /// Sum of all pending error
    pub fn total(&self) -> f32 {
        self.data.iter().sum()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Accumulate `error` from pixel (x, y) onto its kernel neighbours.
    /// Neighbours outside the buffer are dropped.
    pub fn spread(&mut self, x: u32, y: u32, error: f32, kernel: &DiffusionKernel) {
        for t in kernel.taps {
            let target_x = x as i64 + t.dx as i64;
            let target_y = y as u64 + t.dy as u64;
            if target_x < 0 || target_x >= self.width as i64 || target_y >= self.height as u64 {
                continue;
            }
            let idx = self.index(target_x as u32, target_y as u32);
            self.data[idx] += error * t.weight / kernel.divisor;
        }
    }
}

/// Error-diffuse one channel plane to pure black/white.
///
/// `strength` scales the residual before it is spread; 0 turns the pass into
/// a flat 128 threshold.
pub fn diffuse_channel(
    plane: &GrayImage,
    kernel: &DiffusionKernel,
    strength: f32,
    buffer: &mut ErrorBuffer,
) -> GrayImage {
    let (width, height) = plane.dimensions();
    buffer.reset(width, height);
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let value = plane.get_pixel(x, y)[0] as f32 + buffer.get(x, y);
            let q = quantize(value, MID_THRESHOLD);
            output.put_pixel(x, y, Luma([q.level]));

            let error = q.error * strength;
            if error != 0.0 {
                buffer.spread(x, y, error, kernel);
            }
        }
    }

    output
}
