//! Command line arguments for the `snapqueue-host` binary.

use crate::config::Config;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapqueue-host")]
#[command(version, about = "Run one SnapQueue plugin session", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The `--config` path, or the default location when the flag is absent.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_config_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["snapqueue-host"]).unwrap();
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::try_parse_from(["snapqueue-host", "-c", "x.toml"]).unwrap();
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("x.toml"));

        let cli = Cli::try_parse_from(["snapqueue-host", "--config", "./y.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("./y.toml")));
    }

    #[test]
    fn test_help_is_not_a_config_path() {
        let err = Cli::try_parse_from(["snapqueue-host", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["snapqueue-host", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_positional_path_is_rejected() {
        let err = Cli::try_parse_from(["snapqueue-host", "./config.toml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
