use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use trivia_maze_core::GameConfig;

/// Save file used when neither the config file nor the command line names one.
const DEFAULT_SAVE_PATH: &str = "trivia-maze.save";

/// Settings read from the optional TOML configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    /// Parameters for every new game started by the adapter.
    pub(crate) game: GameConfig,
    /// Question bank to load instead of the bundled one.
    pub(crate) questions: Option<PathBuf>,
    /// File written by `save` and read by `load`.
    pub(crate) save_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            questions: None,
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
        }
    }
}

impl CliConfig {
    /// Reads and parses a configuration file.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }

    /// Parses a configuration document.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
