use multiedit_engine::{Settings, UnitKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// User configuration, stored as TOML.
///
/// Every field is optional in the file; missing ones take the engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Draw cursors in the face of the text they matched
    pub match_cursor_visual_style: bool,
    /// Unit kinds to cycle through when no mode has its own list
    pub default_unit_kinds: Vec<UnitKind>,
    /// Where the CLI writes its log; the terminal belongs to the UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Unit kinds to cycle through, keyed by mode name
    pub unit_kinds_by_mode: BTreeMap<String, Vec<UnitKind>>,
}

impl Default for Config {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            match_cursor_visual_style: settings.match_cursor_visual_style,
            default_unit_kinds: settings.default_unit_kinds,
            log_file: None,
            unit_kinds_by_mode: settings.unit_kinds_by_mode,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the log path
        config.log_file = config
            .log_file
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/multiedit");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Log file to use, falling back to one next to the config file
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            let config_dir = shellexpand::tilde("~/.config/multiedit");
            PathBuf::from(config_dir.as_ref()).join("multiedit.log")
        })
    }

    pub fn into_settings(self) -> Settings {
        Settings {
            match_cursor_visual_style: self.match_cursor_visual_style,
            default_unit_kinds: self.default_unit_kinds,
            unit_kinds_by_mode: self.unit_kinds_by_mode,
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
