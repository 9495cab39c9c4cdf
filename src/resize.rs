use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbImage;

use crate::error::FrameError;

/// Scale a decoded frame to exactly `width` x `height` with bilinear filtering.
///
/// Aspect ratio is not preserved. A frame that already has the target size is
/// returned unchanged.
pub fn resize_frame(img: &RgbImage, width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }

    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err(FrameError::Resize(format!(
            "cannot resize {}x{} to {}x{}",
            src_width, src_height, width, height
        )));
    }

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x3)
        .map_err(|e| FrameError::Resize(e.to_string()))?;

    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| FrameError::Resize(e.to_string()))?;

    RgbImage::from_raw(width, height, dst_image.buffer().to_vec())
        .ok_or_else(|| FrameError::Resize("resized buffer has unexpected length".to_string()))
}
