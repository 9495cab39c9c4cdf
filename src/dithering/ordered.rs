//! Ordered (Bayer matrix) dithering
//!
//! Stateless per pixel, so rows are thresholded in parallel.
use image::GrayImage;
use rayon::prelude::*;

use super::quantize::threshold_level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BayerMatrix {
    size: usize,
    levels: &'static [u8],
}

pub const BAYER_2X2: BayerMatrix = BayerMatrix {
    size: 2,
    levels: &[
        0, 2, //
        3, 1,
    ],
};

pub const BAYER_4X4: BayerMatrix = BayerMatrix {
    size: 4,
    levels: &[
        0, 8, 2, 10, //
        12, 4, 14, 6, //
        3, 11, 1, 9, //
        15, 7, 13, 5,
    ],
};

pub const BAYER_8X8: BayerMatrix = BayerMatrix {
    size: 8,
    levels: &[
        0, 32, 8, 40, 2, 34, 10, 42, //
        48, 16, 56, 24, 50, 18, 58, 26, //
        12, 44, 4, 36, 14, 46, 6, 38, //
        60, 28, 52, 20, 62, 30, 54, 22, //
        3, 35, 11, 43, 1, 33, 9, 41, //
        51, 19, 59, 27, 49, 17, 57, 25, //
        15, 47, 7, 39, 13, 45, 5, 37, //
        63, 31, 55, 23, 61, 29, 53, 21,
    ],
};

impl BayerMatrix {
    /// Matrix for a validated size (2, 4 or 8)
    pub fn for_size(size: usize) -> Option<&'static BayerMatrix> {
        match size {
            2 => Some(&BAYER_2X2),
            4 => Some(&BAYER_4X4),
            8 => Some(&BAYER_8X8),
            _ => None,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn level(&self, x: usize, y: usize) -> u8 {
        self.levels[(y % self.size) * self.size + (x % self.size)]
    }

    /// Threshold for pixel (x, y) in sample units.
    ///
    /// Levels are centred in their cell, `(level + 0.5) / N²`, so pure black
    /// and pure white never produce stray dots.
    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        let cells = (self.size * self.size) as f32;
        (self.level(x, y) as f32 + 0.5) * 255.0 / cells
    }
}

pub fn ordered_channel(plane: &GrayImage, matrix: &BayerMatrix) -> GrayImage {
    let (width, height) = plane.dimensions();
    let mut output = GrayImage::new(width, height);
    let row_len = width as usize;
    if row_len == 0 {
        return output;
    }

    output
        .par_chunks_mut(row_len)
        .zip(plane.par_chunks(row_len))
        .enumerate()
        .for_each(|(y, (out_row, in_row))| {
            for (x, (out, &sample)) in out_row.iter_mut().zip(in_row).enumerate() {
                *out = threshold_level(sample as f32, matrix.threshold(x, y));
            }
        });

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const MATRICES: [BayerMatrix; 3] = [BAYER_2X2, BAYER_4X4, BAYER_8X8];

    #[test]
    fn test_levels_are_a_permutation() {
        for matrix in MATRICES {
            let mut levels = matrix.levels.to_vec();
            levels.sort_unstable();
            let expected: Vec<u8> = (0..(matrix.size * matrix.size) as u8).collect();
            assert_eq!(levels, expected, "{}x{}", matrix.size, matrix.size);
        }
    }

    #[test]
    fn test_matrices_follow_recursive_construction() {
        // M(2n) = [[4M, 4M + 2], [4M + 3, 4M + 1]]
        for (small, large) in [(BAYER_2X2, BAYER_4X4), (BAYER_4X4, BAYER_8X8)] {
            let n = small.size;
            for y in 0..2 * n {
                for x in 0..2 * n {
                    let offset = match (y / n, x / n) {
                        (0, 0) => 0,
                        (0, 1) => 2,
                        (1, 0) => 3,
                        _ => 1,
                    };
                    assert_eq!(large.level(x, y), 4 * small.level(x, y) + offset);
                }
            }
        }
    }

    #[test]
    fn test_for_size() {
        assert_eq!(BayerMatrix::for_size(4).unwrap().size(), 4);
        assert!(BayerMatrix::for_size(3).is_none());
    }

    #[test]
    fn test_extremes_stay_solid() {
        for matrix in MATRICES {
            let black = ordered_channel(&GrayImage::from_pixel(16, 16, Luma([0])), &matrix);
            let white = ordered_channel(&GrayImage::from_pixel(16, 16, Luma([255])), &matrix);
            assert!(black.pixels().all(|p| p[0] == 0));
            assert!(white.pixels().all(|p| p[0] == 255));
        }
    }

    #[test]
    fn test_uniform_tile_fill_matches_level_count() {
        // A flat value v lights exactly the cells whose threshold is <= v
        let matrix = BAYER_4X4;
        for value in [20u8, 64, 128, 200] {
            let out = ordered_channel(&GrayImage::from_pixel(4, 4, Luma([value])), &matrix);
            let lit = out.pixels().filter(|p| p[0] == 255).count();
            let expected = (0..16)
                .filter(|&i| (i as f32 + 0.5) * 255.0 / 16.0 <= value as f32)
                .count();
            assert_eq!(lit, expected, "value {}", value);
        }
    }

    #[test]
    fn test_deterministic() {
        let plane = GrayImage::from_fn(50, 30, |x, y| Luma([((x * 5 + y * 3) % 256) as u8]));
        for matrix in MATRICES {
            assert_eq!(ordered_channel(&plane, &matrix), ordered_channel(&plane, &matrix));
        }
    }

    #[test]
    fn test_gradient_tracks_intensity() {
        let plane = GrayImage::from_fn(256, 4, |x, _| Luma([x as u8]));
        let out = ordered_channel(&plane, &BAYER_4X4);

        // Average each 4x4 tile along the gradient
        let tile_means: Vec<f32> = (0..64)
            .map(|tile| {
                let sum: u32 = (0..4)
                    .flat_map(|y| (0..4).map(move |dx| (tile * 4 + dx, y)))
                    .map(|(x, y)| out.get_pixel(x, y)[0] as u32)
                    .sum();
                sum as f32 / 16.0
            })
            .collect();

        assert_eq!(tile_means[0], 0.0);
        assert_eq!(tile_means[63], 255.0);
        for tile in 1..64 {
            assert!(tile_means[tile] >= tile_means[tile - 1]);
            let ideal = tile as f32 * 4.0 + 1.5;
            assert!(
                (tile_means[tile] - ideal).abs() <= 20.0,
                "tile {} mean {} ideal {}",
                tile,
                tile_means[tile],
                ideal
            );
        }
        // Strictly brighter every 16 columns (one quantization step)
        for tile in 4..64 {
            assert!(tile_means[tile] > tile_means[tile - 4]);
        }
    }
}
