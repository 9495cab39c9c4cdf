//! Bi-level quantization of a single sample.

pub const BLACK: u8 = 0;
pub const WHITE: u8 = 255;

/// Standard black/white decision threshold
pub const MID_THRESHOLD: f32 = 128.0;

/// Output of quantizing one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantized {
    pub level: u8,
    /// `value - level`, computed from the unclamped input
    pub error: f32,
}

/// Quantize `value` (sample plus any accumulated error) to black or white.
///
/// The decision is taken on the clamped value, the residual on the raw one, so
/// error pushed outside [0, 255] by earlier pixels is still carried forward.
#[inline]
pub fn quantize(value: f32, threshold: f32) -> Quantized {
    let level = threshold_level(value.clamp(0.0, 255.0), threshold);
    Quantized {
        level,
        error: value - level as f32,
    }
}

/// `WHITE` when `sample >= threshold`, otherwise `BLACK`
#[inline]
pub fn threshold_level(sample: f32, threshold: f32) -> u8 {
    if sample >= threshold {
        WHITE
    } else {
        BLACK
    }
}
