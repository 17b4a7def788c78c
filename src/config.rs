use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_MASK_CENTER: (f64, f64) = (320.0, 240.0);
const DEFAULT_MASK_RADIUS: (f64, f64) = (300.0, 220.0);
const DEFAULT_ANNOTATION_SIZE: usize = 2;
const DEFAULT_ANNOTATION_COLOR: [u8; 3] = [255, 0, 0];
const DEFAULT_OUTPUT_FPS: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    mask: Option<MaskConfigFile>,
    annotation: Option<AnnotationConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct MaskConfigFile {
    apply: Option<bool>,
    center: Option<(f64, f64)>,
    radius: Option<(f64, f64)>,
    hard: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotationConfigFile {
    size: Option<usize>,
    color: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mask: MaskSettings,
    pub annotation: AnnotationSettings,
    pub output_fps: u32,
}

#[derive(Debug, Clone)]
pub struct MaskSettings {
    pub apply: bool,
    pub center: (f64, f64),
    pub radius: (f64, f64),
    pub hard: bool,
}

#[derive(Debug, Clone)]
pub struct AnnotationSettings {
    pub size: usize,
    pub color: Vec<u8>,
}

impl PipelineConfig {
    /// Defaults, overlaid with the TOML file named by `FRAMECAP_CONFIG`
    /// when that variable is set.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FRAMECAP_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let mask = MaskSettings {
            apply: file.mask.as_ref().and_then(|mask| mask.apply).unwrap_or(false),
            center: file
                .mask
                .as_ref()
                .and_then(|mask| mask.center)
                .unwrap_or(DEFAULT_MASK_CENTER),
            radius: file
                .mask
                .as_ref()
                .and_then(|mask| mask.radius)
                .unwrap_or(DEFAULT_MASK_RADIUS),
            hard: file.mask.and_then(|mask| mask.hard).unwrap_or(false),
        };
        let annotation = AnnotationSettings {
            size: file
                .annotation
                .as_ref()
                .and_then(|annotation| annotation.size)
                .unwrap_or(DEFAULT_ANNOTATION_SIZE),
            color: file
                .annotation
                .and_then(|annotation| annotation.color)
                .unwrap_or_else(|| DEFAULT_ANNOTATION_COLOR.to_vec()),
        };
        let output_fps = file
            .output
            .and_then(|output| output.fps)
            .unwrap_or(DEFAULT_OUTPUT_FPS);
        Self {
            mask,
            annotation,
            output_fps,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.mask.radius.0 <= 0.0 || self.mask.radius.1 <= 0.0 {
            return Err(anyhow!("mask radius components must be positive"));
        }
        if self.annotation.color.is_empty() {
            return Err(anyhow!("annotation color must have at least one channel"));
        }
        if self.output_fps == 0 {
            return Err(anyhow!("output fps must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_file(PipelineConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_a_file() {
        let cfg = PipelineConfig::default();
        assert!(!cfg.mask.apply);
        assert_eq!(cfg.annotation.size, DEFAULT_ANNOTATION_SIZE);
        assert_eq!(cfg.output_fps, DEFAULT_OUTPUT_FPS);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[mask]\napply = true\ncenter = [100.0, 90.0]\n\n[output]\nfps = 25\n"
        )
        .unwrap();
        let cfg = PipelineConfig::load_from(file.path()).unwrap();
        assert!(cfg.mask.apply);
        assert_eq!(cfg.mask.center, (100.0, 90.0));
        assert_eq!(cfg.mask.radius, DEFAULT_MASK_RADIUS);
        assert_eq!(cfg.output_fps, 25);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[output]\nfps = 0\n").unwrap();
        assert!(PipelineConfig::load_from(file.path()).is_err());
    }
}
