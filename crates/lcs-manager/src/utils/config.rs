//! Application configuration management utilities.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;

pub const DEFAULT_MODS_DIR: &str = "mods";
pub const DEFAULT_OVERLAY_DIR: &str = "overlay";
pub const DEFAULT_DISABLED_LIST: &str = "disabled.txt";
pub const DEFAULT_STATE_FILE: &str = "overlay.state";

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Verified game directory (the folder containing `League of Legends.exe`).
    pub game_dir: Option<String>,
    pub overlay_dir: Option<String>,
    pub mods_dir: Option<String>,
    /// Newline-delimited list of disabled mod names.
    pub disabled_list: Option<String>,
    /// Engine state saved between runs so `sync` only redoes what changed.
    pub state_file: Option<String>,
}

/// Per-invocation path overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub game_dir: Option<String>,
    pub mods_dir: Option<String>,
    pub overlay_dir: Option<String>,
}

/// Effective paths for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Unverified; see [`crate::commands::require_game_dir`].
    pub game_dir: Option<String>,
    pub mods_dir: Utf8PathBuf,
    pub overlay_dir: Utf8PathBuf,
    pub disabled_list: Utf8PathBuf,
    pub state_file: Utf8PathBuf,
}

impl AppConfig {
    /// Combine the configuration with command-line overrides and defaults.
    pub fn resolve(&self, overrides: &PathOverrides) -> ResolvedPaths {
        let pick = |flag: &Option<String>, configured: &Option<String>, default: &str| {
            Utf8PathBuf::from(
                flag.as_deref()
                    .or(configured.as_deref())
                    .unwrap_or(default),
            )
        };

        ResolvedPaths {
            game_dir: overrides.game_dir.clone().or_else(|| self.game_dir.clone()),
            mods_dir: pick(&overrides.mods_dir, &self.mods_dir, DEFAULT_MODS_DIR),
            overlay_dir: pick(&overrides.overlay_dir, &self.overlay_dir, DEFAULT_OVERLAY_DIR),
            disabled_list: pick(&None, &self.disabled_list, DEFAULT_DISABLED_LIST),
            state_file: pick(&None, &self.state_file, DEFAULT_STATE_FILE),
        }
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns a config file path located next to the executable.
pub fn config_path(file_name: &str) -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join(file_name))
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    config_path("config.toml")
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    match default_config_path() {
        Some(path) => load_config_from(&path),
        None => AppConfig::default(),
    }
}

/// Loads the configuration at `path`, falling back to defaults.
pub fn load_config_from(path: &Utf8PathBuf) -> AppConfig {
    let Ok(content) = fs::read_to_string(path.as_std_path()) else {
        return AppConfig::default();
    };
    match toml::from_str(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring unparsable config '{}': {}", path, e);
            AppConfig::default()
        }
    }
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    if let Some(path) = default_config_path() {
        save_config_to(&path, cfg)
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        ))
    }
}

pub fn save_config_to(path: &Utf8PathBuf, cfg: &AppConfig) -> io::Result<()> {
    let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    fs::write(path.as_std_path(), content)
}
