use clap::Parser;
use std::path::PathBuf;

/// Command-line overrides. Anything given here wins over the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "videoke")]
#[command(about = "Fullscreen karaoke video kiosk", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Run fullscreen at the desktop resolution
    #[arg(short, long)]
    pub fullscreen: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Log debug messages
    #[arg(short, long, visible_alias = "verbose", short_alias = 'v')]
    pub debug: bool,

    /// Target frame rate (0 for unbounded)
    #[arg(short = 'F', long, visible_alias = "FPS")]
    pub fps: Option<u32>,

    /// Config file to read instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra directory to read music videos from
    #[arg(short, long, visible_alias = "music")]
    pub music_dir: Option<PathBuf>,

    /// Directory holding the bundled backgrounds and music
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    /// Log level requested on the command line, if any
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        if self.debug {
            Some(log::LevelFilter::Debug)
        } else if self.quiet {
            Some(log::LevelFilter::Warn)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli =
            Cli::try_parse_from(["videoke", "-f", "-d", "-F", "30", "-m", "/tmp/music"]).unwrap();
        assert!(cli.fullscreen);
        assert!(cli.debug);
        assert_eq!(cli.fps, Some(30));
        assert_eq!(cli.music_dir, Some(PathBuf::from("/tmp/music")));
        assert_eq!(cli.log_level(), Some(log::LevelFilter::Debug));
    }

    #[test]
    fn test_long_aliases() {
        let cli = Cli::try_parse_from([
            "videoke",
            "--verbose",
            "--FPS",
            "0",
            "--music",
            "/srv/karaoke",
            "--config",
            "/etc/videoke.toml",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.fps, Some(0));
        assert_eq!(cli.music_dir, Some(PathBuf::from("/srv/karaoke")));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/videoke.toml")));

        let cli = Cli::try_parse_from(["videoke", "-v"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_quiet_and_defaults() {
        let cli = Cli::try_parse_from(["videoke", "-q"]).unwrap();
        assert_eq!(cli.log_level(), Some(log::LevelFilter::Warn));

        let cli = Cli::try_parse_from(["videoke"]).unwrap();
        assert!(!cli.fullscreen);
        assert_eq!(cli.log_level(), None);
        assert!(Cli::try_parse_from(["videoke", "-q", "-d"]).is_err());
    }
}
