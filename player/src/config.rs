use anyhow::{Context, Result};
use common::{Color, VideokeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::validate_enum;

/// Application name, used for config and data directories
pub const SLUG: &str = "videoke";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub paths: PathSettings,
}

/// General player settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub fullscreen: bool,

    /// 0 for unbounded
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Ignored when fullscreen (desktop resolution is used)
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,

    #[serde(default = "default_screen_height")]
    pub screen_height: u32,

    #[serde(default)]
    pub background_color: Color,

    #[serde(default = "default_caption")]
    pub caption: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            fullscreen: false,
            fps: default_fps(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            background_color: Color::BLACK,
            caption: default_caption(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_fps() -> u32 {
    60
}
fn default_screen_width() -> u32 {
    1600
}
fn default_screen_height() -> u32 {
    900
}
fn default_caption() -> String {
    "Videokê RES".to_string()
}

/// Where backgrounds and music live
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathSettings {
    /// Bundled data (backgrounds/ and music/ subdirectories)
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Extra music directory, scanned last
    #[serde(default)]
    pub music_dir: Option<String>,
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(VideokeError::from)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the first config file that exists, or defaults if there is none.
    ///
    /// Returns the path that was read alongside the configuration.
    pub fn load_first(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>)> {
        for path in candidates {
            if path.is_file() {
                let config = Self::load_from_path(path)?;
                return Ok((config, Some(path.clone())));
            }
        }

        Ok((Self::default(), None))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(SLUG);

        Ok(config_dir.join(format!("{}.toml", SLUG)))
    }

    /// Config files to try, most specific first
    pub fn candidate_paths(explicit: Option<&Path>, data_dir: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        if let Ok(path) = Self::default_config_path() {
            candidates.push(path);
        }
        candidates.push(data_dir.join("..").join(format!("{}.toml", SLUG)));

        candidates
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        self.validate_log_level(&self.general.log_level)?;

        if self.general.screen_width == 0 || self.general.screen_height == 0 {
            anyhow::bail!(
                "Invalid screen size: {}x{}",
                self.general.screen_width,
                self.general.screen_height
            );
        }

        Ok(())
    }

    fn validate_log_level(&self, level: &str) -> Result<()> {
        validate_enum!(level, "trace", "debug", "info", "warn", "error")
    }
}

/// Resolved runtime options: defaults < config file < command line
#[derive(Debug, Clone)]
pub struct Options {
    pub fullscreen: bool,
    pub log_level: log::LevelFilter,
    pub screen_size: (u32, u32),
    pub fps: u32,
    pub background_color: Color,
    pub caption: String,
    pub data_dir: PathBuf,
    pub music_dir: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Options {
    pub fn resolve(cli: &Cli, config: &Config, config_path: Option<PathBuf>) -> Self {
        let general = &config.general;

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| config.paths.data_dir.as_deref().map(expand_path))
            .unwrap_or_else(default_data_dir);

        let music_dir = cli
            .music_dir
            .as_deref()
            .map(|p| expand_path(&p.to_string_lossy()))
            .or_else(|| config.paths.music_dir.as_deref().map(expand_path))
            .unwrap_or_else(|| data_dir.join("music"));

        let log_level = cli
            .log_level()
            .unwrap_or_else(|| parse_level(&general.log_level));

        Self {
            fullscreen: cli.fullscreen || general.fullscreen,
            log_level,
            screen_size: (general.screen_width, general.screen_height),
            fps: cli.fps.unwrap_or(general.fps),
            background_color: general.background_color,
            caption: general.caption.clone(),
            data_dir,
            music_dir,
            config_path,
        }
    }

    pub fn backgrounds_dir(&self) -> PathBuf {
        self.data_dir.join("backgrounds")
    }

    /// Music directories in scan order; later entries win on name collisions
    pub fn music_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.data_dir.join("music")];
        if let Some(user_data) = user_data_dir() {
            dirs.push(user_data.join("music"));
        }
        dirs.push(self.music_dir.clone());
        dirs
    }
}

/// Per-user data directory (`$XDG_DATA_HOME/videoke`)
pub fn user_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(SLUG))
}

/// `data/` next to the executable, or in the working directory
pub fn default_data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("data")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn parse_level(level: &str) -> log::LevelFilter {
    level.parse().unwrap_or(log::LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.fps, 60);
        assert_eq!(
            (config.general.screen_width, config.general.screen_height),
            (1600, 900)
        );
        assert_eq!(config.general.background_color, Color::BLACK);
        assert!(config.paths.music_dir.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r##"
[general]
log_level = "debug"
fullscreen = true
fps = 30
background_color = "#FF00FF"

[paths]
music_dir = "/srv/karaoke"
"##;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.log_level, "debug");
        assert!(config.general.fullscreen);
        assert_eq!(config.general.fps, 30);
        assert_eq!(config.general.background_color, Color::MAGENTA);
        assert_eq!(config.general.screen_width, 1600);
        assert_eq!(config.paths.music_dir.as_deref(), Some("/srv/karaoke"));
    }

    #[test]
    fn test_invalid_config() {
        let config: Config = toml::from_str("[general]\nlog_level = \"loud\"\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[general]\nscreen_width = 0\n").unwrap();
        assert!(config.validate().is_err());

        assert!(toml::from_str::<Config>("[general]\nbackground_color = \"nope\"\n").is_err());
    }

    #[test]
    fn test_load_first_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("videoke.toml");
        fs::write(&present, "[general]\nfps = 24\n").unwrap();

        let (config, path) = Config::load_first(&[missing.clone(), present.clone()]).unwrap();
        assert_eq!(config.general.fps, 24);
        assert_eq!(path, Some(present));

        let (config, path) = Config::load_first(&[missing]).unwrap();
        assert_eq!(config.general.fps, 60);
        assert!(path.is_none());
    }

    #[test]
    fn test_load_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videoke.toml");
        fs::write(&path, "[general\nfps = ").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VideokeError>(),
            Some(VideokeError::Io(_))
        ));
    }

    #[test]
    fn test_command_line_wins() {
        let config: Config = toml::from_str(
            r#"
[general]
log_level = "error"
fps = 30

[paths]
data_dir = "/opt/videoke/data"
music_dir = "/srv/karaoke"
"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["videoke", "-F", "0", "-m", "/media/usb", "-d"]).unwrap();
        let options = Options::resolve(&cli, &config, None);
        assert_eq!(options.fps, 0);
        assert_eq!(options.music_dir, PathBuf::from("/media/usb"));
        assert_eq!(options.log_level, log::LevelFilter::Debug);
        assert_eq!(options.data_dir, PathBuf::from("/opt/videoke/data"));
        assert_eq!(
            options.backgrounds_dir(),
            PathBuf::from("/opt/videoke/data/backgrounds")
        );

        let cli = Cli::try_parse_from(["videoke"]).unwrap();
        let options = Options::resolve(&cli, &config, None);
        assert_eq!(options.fps, 30);
        assert_eq!(options.music_dir, PathBuf::from("/srv/karaoke"));
        assert_eq!(options.log_level, log::LevelFilter::Error);
    }

    #[test]
    fn test_music_dirs_order() {
        let cli = Cli::try_parse_from(["videoke", "--data-dir", "/data", "-m", "/extra"]).unwrap();
        let options = Options::resolve(&cli, &Config::default(), None);
        let dirs = options.music_dirs();
        assert_eq!(dirs.first(), Some(&PathBuf::from("/data/music")));
        assert_eq!(dirs.last(), Some(&PathBuf::from("/extra")));
    }

    #[test]
    fn test_default_music_dir_follows_data_dir() {
        let cli = Cli::try_parse_from(["videoke", "--data-dir", "/data"]).unwrap();
        let options = Options::resolve(&cli, &Config::default(), None);
        assert_eq!(options.music_dir, PathBuf::from("/data/music"));
        assert_eq!(options.log_level, log::LevelFilter::Info);
    }
}
