//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use coursevault_core::ModeOverrides;
use coursevault_core::config::DEFAULT_CONFIG_FILE;

/// Mirror a course portal's files locally.
///
/// Coursevault indexes every course, module and file the session can see,
/// then downloads what is not on disk yet. Re-running resumes where the last
/// run stopped.
#[derive(Parser, Debug)]
#[command(name = "coursevault")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the JSON config file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Never prompt; answer from the config's always_* settings
    #[arg(long)]
    pub static_settings: bool,

    /// Rebuild the index from the portal even if one is saved
    #[arg(long)]
    pub reindex: bool,

    /// Download every indexed file again
    #[arg(long)]
    pub redownload: bool,
}

impl Args {
    /// Mode switches to apply over the config file.
    #[must_use]
    pub fn mode_overrides(&self) -> ModeOverrides {
        ModeOverrides {
            static_settings: self.static_settings,
            reindex: self.reindex,
            redownload: self.redownload,
        }
    }

    /// Default log level when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["coursevault"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.mode_overrides(), ModeOverrides::default());
        assert_eq!(args.default_log_level(), "info");
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["coursevault", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["coursevault", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn test_cli_quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["coursevault", "-q", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_config_path() {
        let args = Args::try_parse_from(["coursevault", "--config", "/etc/cv.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/cv.json"));

        let args = Args::try_parse_from(["coursevault", "-c", "local.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("local.json"));
    }

    #[test]
    fn test_cli_mode_flags() {
        let args = Args::try_parse_from([
            "coursevault",
            "--static-settings",
            "--reindex",
            "--redownload",
        ])
        .unwrap();
        assert_eq!(
            args.mode_overrides(),
            ModeOverrides {
                static_settings: true,
                reindex: true,
                redownload: true,
            }
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["coursevault", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["coursevault", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["coursevault", "--invalid-flag"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
