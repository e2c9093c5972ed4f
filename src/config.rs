use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{{io, io::Write, fs}, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config directory")]
    ConfigDir,

    #[error("Failed to load config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to deserialize config file: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// Run-wide knobs that don't belong on the command line because they rarely
/// change between invocations. Never overrides a machine invariant (memory
/// layout, word width) - those stay fixed in `quadasm_core`.
#[derive(Serialize, Deserialize)]
pub struct Config {
    /// Directory `.ob`/`.ent`/`.ext` files are written to, relative to the
    /// input file if unset.
    pub output_dir: Option<String>,

    /// Keep going after a file with diagnostics instead of stopping at the
    /// first one.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { output_dir: None, continue_on_error: true }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let project = ProjectDirs::from("", "", "quadasm")
            .ok_or(ConfigError::ConfigDir)?;
        let directory = project.config_dir()
            .to_str()
            .ok_or(ConfigError::ConfigDir)?;
        let path: PathBuf = [directory, "config.toml"].iter().collect();
        Ok(toml::from_str(&std::fs::read_to_string(&path)?)?)
    }

    pub fn store(&self) -> Result<(), ConfigError> {
        let project = ProjectDirs::from("", "", "quadasm")
            .ok_or(ConfigError::ConfigDir)?;
        let directory = project.config_dir()
            .to_str()
            .ok_or(ConfigError::ConfigDir)?;
        fs::create_dir_all(project.config_dir())?;
        let path: PathBuf = [directory, "config.toml"].iter().collect();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let string = toml::to_string_pretty(self)?;
        Ok(file.write_all(string.as_bytes())?)
    }
}
