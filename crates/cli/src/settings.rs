//! Import config discovery and `dyetrack config`.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use dyetrack_recon::ImportConfig;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective import config as TOML
    Show,

    /// Parse and validate a config file
    #[command(after_help = "\
Examples:
  dyetrack config validate dyehouse.toml
  dyetrack --config dyehouse.toml config validate")]
    Validate {
        /// Config to check (defaults to the discovered config)
        path: Option<PathBuf>,
    },
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Flag(PathBuf),
    User(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(p) | Self::User(p) => write!(f, "{}", p.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// `$XDG_CONFIG_HOME/dyetrack/config.toml` (platform config dir elsewhere).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dyetrack").join("config.toml"))
}

/// Resolve and load the import config.
///
/// An explicit path must exist. The user config is optional.
pub fn load(flag: Option<&Path>) -> Result<(ImportConfig, ConfigSource), CliError> {
    let source = match flag {
        Some(path) => ConfigSource::Flag(path.to_path_buf()),
        None => match user_config_path().filter(|p| p.is_file()) {
            Some(path) => ConfigSource::User(path),
            None => ConfigSource::Defaults,
        },
    };

    let config = match &source {
        ConfigSource::Flag(path) | ConfigSource::User(path) => read(path)?,
        ConfigSource::Defaults => ImportConfig::default(),
    };
    tracing::debug!(source = %source, "import config loaded");
    Ok((config, source))
}

fn read(path: &Path) -> Result<ImportConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    ImportConfig::from_toml(&text)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display())))
}

pub fn cmd_config(flag: Option<&Path>, cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show => {
            let (config, source) = load(flag)?;
            let text = config.to_toml()?;
            eprintln!("# source: {source}");
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Validate { path } => {
            let (config, source) = match path {
                Some(path) => (read(&path)?, ConfigSource::Flag(path)),
                None => load(flag)?,
            };
            let layout = &config.layout;
            eprintln!(
                "{source}: ok (data from row {}, machines from column {})",
                layout.data_start_row + 1,
                config.machines.scan_start + 1,
            );
            Ok(())
        }
    }
}
