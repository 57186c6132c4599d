//! Optional TOML configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use buildboard_progress::EngineConfig;
use serde::Deserialize;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "buildboard.toml";

/// Contents of `buildboard.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Where the JSON store keeps its rows
    pub data_dir: Option<PathBuf>,
    /// Engine tuning
    pub engine: EngineConfig,
}

impl FileConfig {
    /// Read `path`, or the default file if present. A missing default file
    /// yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
