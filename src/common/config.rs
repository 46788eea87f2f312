use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::layout_engine::items::{PanelItem, parse_panel_items};
use crate::ui::color::Color;

pub const DEFAULT_PANEL_ITEMS: &str = "TSC";
pub const DEFAULT_FONT: &str = "Sans 10";
pub const DEFAULT_HEIGHT: u32 = 30;

const CONFIG_DIR: &str = "taskstrip";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    Bottom,
    #[default]
    Top,
    Overlay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    pub background: Color,
    pub text: Color,
    pub button_background: Color,
    pub button_active: Color,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            background: Color::from_rgba(0x323232FF),
            text: Color::from_rgba(0xFFFFFFFF),
            button_background: Color::from_rgba(0x4A4A4AFF),
            button_active: Color::from_rgba(0x5A8AC6FF),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Item codes laid out left to right: `T` taskbar, `C` clock, `S` spacer.
    pub panel_items: String,
    /// Pango-style font description, e.g. `"Sans 10"`.
    pub font: String,
    /// Name of the output to place the panel on; compositor's choice if unset.
    pub output: Option<String>,
    pub position: Position,
    pub layer: Layer,
    pub height: u32,
    /// Seconds until the panel closes itself; 0 keeps it open.
    pub close_timeout: u64,
    /// Parse window labels as pango markup.
    pub markup: bool,
    pub colors: Colors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            panel_items: DEFAULT_PANEL_ITEMS.to_string(),
            font: DEFAULT_FONT.to_string(),
            output: None,
            position: Position::default(),
            layer: Layer::default(),
            height: DEFAULT_HEIGHT,
            close_timeout: 0,
            markup: false,
            colors: Colors::default(),
        }
    }
}

/// `$XDG_CONFIG_HOME/taskstrip/config.toml`, if a config directory exists.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

impl Config {
    pub fn parse(text: &str) -> Result<Config, toml::de::Error> { toml::from_str(text) }

    /// Reads the config at `path`. A missing file is not an error and yields `None`.
    pub fn load(path: &Path) -> Result<Option<Config>, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "no config file");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        Config::parse(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Like [`Config::load`], but logs failures and falls back to defaults.
    pub fn load_or_default(path: &Path) -> Config {
        match Config::load(path) {
            Ok(Some(config)) => {
                info!(?path, "loaded config");
                config
            }
            Ok(None) => Config::default(),
            Err(err) => {
                error!("{err}");
                Config::default()
            }
        }
    }

    pub fn items(&self) -> Vec<PanelItem> { parse_panel_items(&self.panel_items) }

    pub fn close_timeout(&self) -> Option<Duration> {
        (self.close_timeout > 0).then(|| Duration::from_secs(self.close_timeout))
    }

    pub fn height(&self) -> u32 {
        if self.height == 0 { DEFAULT_HEIGHT } else { self.height }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.panel_items, "TSC");
        assert_eq!(config.close_timeout(), None);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = Config::parse(
            r##"
            panel_items = "TC"
            close_timeout = 5
            position = "bottom"
            unknown_key = true

            [colors]
            text = "#101010"
            "##,
        )
        .unwrap();

        assert_eq!(config.panel_items, "TC");
        assert_eq!(config.position, Position::Bottom);
        assert_eq!(config.close_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.colors.text, Color::from_rgba(0x101010FF));
        assert_eq!(config.colors.background, Colors::default().background);
        assert_eq!(config.font, DEFAULT_FONT);
    }

    #[test]
    fn bad_color_is_a_parse_error() {
        assert!(Config::parse("[colors]\nbackground = \"#12\"").is_err());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "panel_items = [").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn zero_height_uses_default() {
        let config = Config { height: 0, ..Config::default() };
        assert_eq!(config.height(), DEFAULT_HEIGHT);
    }
}
