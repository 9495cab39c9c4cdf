use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Saved run preset
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub name: Option<String>,
    pub config: DitherConfigJson,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DitherConfigJson {
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub method: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frames: Option<usize>,
    pub color: Option<bool>,
    pub dither_strength: Option<f32>,
    pub matrix_size: Option<usize>,
    pub threshold_variance: Option<f32>,
    pub fps: Option<u32>,
    pub seed: Option<u64>,
    pub jobs: Option<usize>,
    pub rgb_output: Option<bool>,
    pub encode: Option<String>,
    pub force: Option<bool>,
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: ConfigFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            let args_from_cli = std::env::args().collect::<Vec<_>>();
            self.merge_from_config(config.config, &args_from_cli);
        }
        Ok(())
    }

    /// Apply every config value whose flag does not appear in `args_from_cli`
    fn merge_from_config(&mut self, config: DitherConfigJson, args_from_cli: &[String]) {
        if self.input.is_none() {
            if let Some(input) = config.input_path {
                self.input = Some(PathBuf::from(input));
            }
        }

        if !flag_given(args_from_cli, &["-o", "--output"]) {
            if let Some(output) = config.output_path {
                self.output_dir = PathBuf::from(output);
            }
        }

        if !flag_given(args_from_cli, &["-m", "--method"]) {
            if let Some(method) = config.method {
                self.method = method;
            }
        }

        if !flag_given(args_from_cli, &["-w", "--width"]) {
            if let Some(width) = config.width {
                self.width = width;
            }
        }

        if !flag_given(args_from_cli, &["--height"]) {
            if let Some(height) = config.height {
                self.height = height;
            }
        }

        if !flag_given(args_from_cli, &["-f", "--frames"]) {
            if let Some(frames) = config.frames {
                self.frames = frames;
            }
        }

        if !flag_given(args_from_cli, &["-d", "--dither-strength"]) {
            if let Some(strength) = config.dither_strength {
                self.dither_strength = strength;
            }
        }

        if !flag_given(args_from_cli, &["--matrix-size"]) {
            if let Some(size) = config.matrix_size {
                self.matrix_size = size;
            }
        }

        if !flag_given(args_from_cli, &["--threshold-variance"]) {
            if let Some(variance) = config.threshold_variance {
                self.threshold_variance = variance;
            }
        }

        if !flag_given(args_from_cli, &["--fps"]) {
            if let Some(fps) = config.fps {
                self.fps = fps;
            }
        }

        if self.seed.is_none() {
            self.seed = config.seed;
        }

        if !flag_given(args_from_cli, &["-j", "--jobs"]) {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        if self.encode.is_none() {
            self.encode = config.encode.map(PathBuf::from);
        }

        // Boolean flags - only apply if currently false (default)
        if !self.color {
            self.color = config.color.unwrap_or(false);
        }

        if !self.rgb_output {
            self.rgb_output = config.rgb_output.unwrap_or(false);
        }

        if !self.force {
            self.force = config.force.unwrap_or(false);
        }
    }
}

/// True when any of `flags` appears in `args`, bare or as `--flag=value`
fn flag_given(args: &[String], flags: &[&str]) -> bool {
    args.iter().any(|arg| {
        flags
            .iter()
            .any(|flag| arg.as_str() == *flag || arg.starts_with(&format!("{}=", flag)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn preset() -> DitherConfigJson {
        DitherConfigJson {
            input_path: Some("clip.mp4".to_string()),
            output_path: Some("preset_frames".to_string()),
            method: Some("ordered".to_string()),
            width: Some(320),
            matrix_size: Some(8),
            color: Some(true),
            seed: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_fills_unset_values() {
        let mut args = Args::default();
        args.merge_from_config(preset(), &["video-dither".to_string()]);

        assert_eq!(args.input, Some(PathBuf::from("clip.mp4")));
        assert_eq!(args.output_dir, PathBuf::from("preset_frames"));
        assert_eq!(args.method, "ordered");
        assert_eq!(args.width, 320);
        assert_eq!(args.height, 960);
        assert_eq!(args.matrix_size, 8);
        assert!(args.color);
        assert_eq!(args.seed, Some(5));
    }

    #[test]
    fn test_command_line_takes_precedence() {
        let mut args = Args {
            method: "atkinson".to_string(),
            width: 540,
            seed: Some(9),
            ..Default::default()
        };
        let cli: Vec<String> = ["video-dither", "-m", "atkinson", "--width=540"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.merge_from_config(preset(), &cli);

        assert_eq!(args.method, "atkinson");
        assert_eq!(args.width, 540);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.matrix_size, 8);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preset.json");
        std::fs::write(
            &path,
            r#"{"name": "noisy", "config": {"method": "random", "thresholdVariance": 90.0}}"#,
        )
        .unwrap();

        let mut args = Args {
            config_file: Some(path),
            ..Default::default()
        };
        args.load_and_merge_config().unwrap();
        assert_eq!(args.method, "random");
        assert_eq!(args.threshold_variance, 90.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut args = Args {
            config_file: Some(path),
            ..Default::default()
        };
        let err = args.load_and_merge_config().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}
