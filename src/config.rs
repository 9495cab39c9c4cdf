use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::DitherError;

/// Largest accepted output dimension on either axis
pub const MAX_DIMENSION: u32 = 8192;

/// Bayer matrix sizes supported by ordered dithering
pub const MATRIX_SIZES: [usize; 3] = [2, 4, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Method {
    /// Floyd-Steinberg error diffusion (best gradients)
    FloydSteinberg,
    /// Atkinson error diffusion (lighter output, discards 2/8 of the error)
    Atkinson,
    /// Jarvis-Judice-Ninke error diffusion (wide, smooth)
    JarvisJudiceNinke,
    /// Ordered dithering with a Bayer matrix
    Ordered,
    /// Random threshold dithering
    Random,
}

impl Method {
    /// Parse a method name. Accepts `snake_case` or `kebab-case`, any letter case.
    pub fn parse(name: &str) -> Result<Self, DitherError> {
        let normalized = name.trim().replace('-', "_");
        Method::from_str(&normalized).map_err(|_| DitherError::UnsupportedMethod(name.to_string()))
    }

    pub fn is_error_diffusion(self) -> bool {
        matches!(
            self,
            Method::FloydSteinberg | Method::Atkinson | Method::JarvisJudiceNinke
        )
    }
}

/// Raw, unvalidated run parameters as they come from the command line or a
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DitherSettings {
    pub method: String,
    pub color: bool,
    pub width: u32,
    pub height: u32,
    /// 0 = process every frame the source yields
    pub frame_limit: usize,
    pub strength: f32,
    pub matrix_size: usize,
    pub threshold_variance: f32,
    pub fps: u32,
    pub seed: Option<u64>,
    pub jobs: usize,
}

impl Default for DitherSettings {
    fn default() -> Self {
        Self {
            method: Method::FloydSteinberg.to_string(),
            color: false,
            width: 540,
            height: 960,
            frame_limit: 720,
            strength: 1.0,
            matrix_size: 4,
            threshold_variance: 50.0,
            fps: 30,
            seed: None,
            jobs: 1,
        }
    }
}

impl DitherSettings {
    /// Check every parameter once and freeze the result.
    ///
    /// Nothing is read from any frame source before this succeeds.
    pub fn validate(&self) -> Result<DitherConfig, DitherError> {
        let method = Method::parse(&self.method)?;

        if !self.strength.is_finite() || !(0.0..=1.0).contains(&self.strength) {
            return Err(DitherError::configuration(
                "strength",
                format!("must be between 0.0 and 1.0 (got {})", self.strength),
            ));
        }

        if !MATRIX_SIZES.contains(&self.matrix_size) {
            return Err(DitherError::configuration(
                "matrix_size",
                format!("must be one of 2, 4, 8 (got {})", self.matrix_size),
            ));
        }

        if !self.threshold_variance.is_finite() || self.threshold_variance < 0.0 {
            return Err(DitherError::configuration(
                "threshold_variance",
                format!("must be a non-negative number (got {})", self.threshold_variance),
            ));
        }

        if self.width == 0 || self.height == 0 {
            return Err(DitherError::configuration(
                "size",
                format!(
                    "width and height must be greater than 0 (got {}x{})",
                    self.width, self.height
                ),
            ));
        }

        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(DitherError::configuration(
                "size",
                format!(
                    "width and height must be at most {} pixels (got {}x{})",
                    MAX_DIMENSION, self.width, self.height
                ),
            ));
        }

        if self.fps == 0 {
            return Err(DitherError::configuration("fps", "must be greater than 0"));
        }

        if self.jobs == 0 {
            return Err(DitherError::configuration("jobs", "must be at least 1"));
        }

        let seed = self.seed.unwrap_or_else(rand::random);

        Ok(DitherConfig {
            method,
            color: self.color,
            width: self.width,
            height: self.height,
            frame_limit: self.frame_limit,
            strength: self.strength,
            matrix_size: self.matrix_size,
            threshold_variance: self.threshold_variance,
            fps: self.fps,
            seed,
            jobs: self.jobs,
        })
    }
}

/// Validated, immutable run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DitherConfig {
    method: Method,
    color: bool,
    width: u32,
    height: u32,
    frame_limit: usize,
    strength: f32,
    matrix_size: usize,
    threshold_variance: f32,
    fps: u32,
    seed: u64,
    jobs: usize,
}

impl DitherConfig {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_color(&self) -> bool {
        self.color
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `None` when unbounded
    pub fn frame_limit(&self) -> Option<usize> {
        (self.frame_limit > 0).then_some(self.frame_limit)
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }

    pub fn threshold_variance(&self) -> f32 {
        self.threshold_variance
    }

    /// Output frame rate. Metadata for the encoder hand-off only.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Short mode label used in output names, e.g. `atkinson_color`
    pub fn label(&self) -> String {
        format!("{}_{}", self.method, if self.color { "color" } else { "bw" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn settings(method: &str) -> DitherSettings {
        DitherSettings {
            method: method.to_string(),
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::iter() {
            assert_eq!(Method::parse(&method.to_string()).unwrap(), method);
        }
        assert_eq!(Method::FloydSteinberg.to_string(), "floyd_steinberg");
        assert_eq!(Method::JarvisJudiceNinke.to_string(), "jarvis_judice_ninke");
    }

    #[test]
    fn test_method_parse_accepts_kebab_and_case() {
        assert_eq!(
            Method::parse("Floyd-Steinberg").unwrap(),
            Method::FloydSteinberg
        );
        assert_eq!(
            Method::parse("JARVIS_JUDICE_NINKE").unwrap(),
            Method::JarvisJudiceNinke
        );
    }

    #[test]
    fn test_unknown_method_is_unsupported() {
        let err = settings("stucki").validate().unwrap_err();
        assert!(matches!(err, DitherError::UnsupportedMethod(ref name) if name == "stucki"));
    }

    #[test]
    fn test_defaults_validate() {
        let config = settings("floyd_steinberg").validate().unwrap();
        assert_eq!(config.method(), Method::FloydSteinberg);
        assert_eq!((config.width(), config.height()), (540, 960));
        assert_eq!(config.frame_limit(), Some(720));
        assert_eq!(config.matrix_size(), 4);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.label(), "floyd_steinberg_bw");
    }

    #[test]
    fn test_zero_frame_limit_is_unbounded() {
        let config = DitherSettings {
            frame_limit: 0,
            ..settings("ordered")
        }
        .validate()
        .unwrap();
        assert_eq!(config.frame_limit(), None);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let cases = [
            DitherSettings {
                strength: -0.1,
                ..settings("atkinson")
            },
            DitherSettings {
                strength: 1.5,
                ..settings("atkinson")
            },
            DitherSettings {
                strength: f32::NAN,
                ..settings("atkinson")
            },
            DitherSettings {
                matrix_size: 3,
                ..settings("ordered")
            },
            DitherSettings {
                threshold_variance: -1.0,
                ..settings("random")
            },
            DitherSettings {
                width: 0,
                ..settings("random")
            },
            DitherSettings {
                height: MAX_DIMENSION + 1,
                ..settings("random")
            },
            DitherSettings {
                fps: 0,
                ..settings("random")
            },
            DitherSettings {
                jobs: 0,
                ..settings("random")
            },
        ];

        for case in cases {
            let err = case.validate().unwrap_err();
            assert!(
                matches!(err, DitherError::Configuration { .. }),
                "expected configuration error for {:?}, got {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: DitherSettings =
            serde_json::from_str(r#"{"method": "random", "thresholdVariance": 20}"#).unwrap();
        assert_eq!(settings.method, "random");
        assert_eq!(settings.threshold_variance, 20.0);
        assert_eq!(settings.width, 540);
        assert_eq!(settings.frame_limit, 720);
    }
}
