use crate::{Error, InputSpec, Resolution, Result, SourceKind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How to pick between the two source variants.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Threaded for device indices, synchronous for paths.
    #[default]
    Auto,
    Threaded,
    Synchronous,
}

impl SourceMode {
    pub fn resolve(self, input: &InputSpec) -> SourceKind {
        match self {
            SourceMode::Threaded => SourceKind::Threaded,
            SourceMode::Synchronous => SourceKind::Synchronous,
            SourceMode::Auto if input.is_device() => SourceKind::Threaded,
            SourceMode::Auto => SourceKind::Synchronous,
        }
    }
}

fn default_width() -> u32 {
    Resolution::default().width
}

fn default_height() -> u32 {
    Resolution::default().height
}

/// Construction inputs for one frame source.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Device index (`"0"`) or file path.
    pub input: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Flip frames horizontally. Only threaded sources apply it.
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub mode: SourceMode,
}

impl SourceConfig {
    pub fn new(input: impl Into<String>) -> Self {
        let resolution = Resolution::default();
        Self {
            input: input.into(),
            width: resolution.width,
            height: resolution.height,
            mirror: false,
            mode: SourceMode::Auto,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn input_spec(&self) -> InputSpec {
        InputSpec::parse(&self.input)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn kind(&self) -> SourceKind {
        self.mode.resolve(&self.input_spec())
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(Error::Config("input must not be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "resolution must be non-zero, got {}",
                self.resolution()
            )));
        }
        Ok(())
    }
}

pub fn load_source_config(path: impl AsRef<Path>) -> anyhow::Result<SourceConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading source config: {}", path.display()))?;
    let config: SourceConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing yaml: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating source config: {}", path.display()))?;
    Ok(config)
}
