use image::{GrayImage, Luma, Rgb, RgbImage};

/// Perceptual luma weights (ITU-R BT.601)
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// A dithered output raster, single-channel or RGB
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Frame {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Gray(img) => img.dimensions(),
            Frame::Rgb(img) => img.dimensions(),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Frame::Gray(_) => 1,
            Frame::Rgb(_) => 3,
        }
    }

    /// Raw interleaved samples
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Frame::Gray(img) => img.as_raw(),
            Frame::Rgb(img) => img.as_raw(),
        }
    }

    /// Replicate a grayscale frame into three identical channels
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Frame::Gray(img) => RgbImage::from_fn(img.width(), img.height(), |x, y| {
                let v = img.get_pixel(x, y)[0];
                Rgb([v, v, v])
            }),
            Frame::Rgb(img) => img.clone(),
        }
    }
}

/// Convert an RGB raster to a single luminance plane
pub fn to_luma(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let luma = LUMA_WEIGHTS[0] * p[0] as f32
            + LUMA_WEIGHTS[1] * p[1] as f32
            + LUMA_WEIGHTS[2] * p[2] as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Extract one channel (0 = R, 1 = G, 2 = B) as its own plane
pub fn extract_channel(img: &RgbImage, channel: usize) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([img.get_pixel(x, y)[channel]])
    })
}

/// Recombine three equally sized planes positionally into one RGB raster
pub fn merge_channels(r: &GrayImage, g: &GrayImage, b: &GrayImage) -> RgbImage {
    RgbImage::from_fn(r.width(), r.height(), |x, y| {
        Rgb([
            r.get_pixel(x, y)[0],
            g.get_pixel(x, y)[0],
            b.get_pixel(x, y)[0],
        ])
    })
}
