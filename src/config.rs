//! INI config loading and XDG path discovery for the standalone binary.
//!
//! Kept behind the `standalone` feature, same as the CLI binary itself: the
//! library core has no opinion about config files or `$XDG_CONFIG_HOME`.

use std::path::{Path, PathBuf};

use ini::Ini;
use log::info;

/// Parsed `[mario]` section of the config file. Unrecognized keys are
/// ignored; `rules_dir`, `strict_content_lookup` and `notifications` are
/// accepted but not yet acted on — reserved for a future multi-file rules
/// directory and notification backend.
#[derive(Debug, Default, Clone)]
pub struct Config {
    pub rules_file: Option<PathBuf>,
    pub rules_dir: Option<PathBuf>,
    pub strict_content_lookup: bool,
    pub notifications: bool,
}

/// Default config file path: `$XDG_CONFIG_HOME/mario/config`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mario").join("config"))
}

/// Default rules file path: `$XDG_CONFIG_HOME/mario/mario.plumb`.
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mario").join("mario.plumb"))
}

/// Default rules directory: `$XDG_CONFIG_HOME/mario/rules.d`.
pub fn default_rules_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mario").join("rules.d"))
}

/// Load the config file at `path`. A missing or unreadable file is not
/// fatal: it's logged at INFO and an all-default [`Config`] is returned, so
/// callers never need to handle a *ConfigIOError* themselves.
pub fn load(path: &Path) -> Config {
    let ini = match Ini::load_from_file(path) {
        Ok(ini) => ini,
        Err(e) => {
            info!("could not read config file {}: {e}, using defaults", path.display());
            return Config::default();
        }
    };

    let section = ini.section(Some("mario"));
    let rules_file = section
        .and_then(|s| s.get("rules file"))
        .map(PathBuf::from);
    let rules_dir = section.and_then(|s| s.get("rules dir")).map(PathBuf::from);
    let strict_content_lookup = section
        .and_then(|s| s.get("strict content lookup"))
        .map(parse_bool)
        .unwrap_or(false);
    let notifications = section
        .and_then(|s| s.get("notifications"))
        .map(parse_bool)
        .unwrap_or(false);

    Config {
        rules_file,
        rules_dir,
        strict_content_lookup,
        notifications,
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
