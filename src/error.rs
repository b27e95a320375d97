//! Error types for configuration merging and command dispatch.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Commands accepted by the dispatcher, in the order they are reported.
pub const SUPPORTED_COMMANDS: [&str; 5] = ["sft", "dpo", "chat", "kto", "env"];

/// Errors raised while loading YAML configuration or merging it with
/// command-line arguments.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file passed to `--config` does not exist.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The config file exists but could not be read.
    #[error("Failed reading config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML.
    #[error("Invalid YAML syntax in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document parsed but its top level is not a mapping.
    #[error("Config file {} must contain a mapping at the top level", .0.display())]
    NotAMapping(PathBuf),

    /// The reserved `env` key holds something other than a mapping.
    #[error("`env` field should be a mapping in the YAML file {}", .0.display())]
    EnvNotAMapping(PathBuf),

    /// `--config` was the last token, with no path after it.
    #[error("--config requires a path to a YAML file")]
    MissingConfigPath,

    /// `--config` was given more than once.
    #[error("--config may only be given once")]
    DuplicateConfigFlag,

    /// YAML keys that no declared option consumed.
    #[error("Some specified config arguments are not used by the parser: {}", keys.join(", "))]
    UnusedKeys { keys: Vec<String> },

    /// A parsed option group rejected its values.
    #[error("Invalid value for `{field}`: {message}")]
    Invalid { field: String, message: String },

    /// Command-line parsing failed (also carries `--help` output).
    #[error(transparent)]
    Args(#[from] clap::Error),

    /// Parsed groups could not be rendered for display.
    #[error("Failed to serialize resolved configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), message: message.into() }
    }
}

/// Errors raised by the subcommand dispatcher.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(
        "Please use one of the supported commands, got {got} - supported commands are {}",
        SUPPORTED_COMMANDS.join(", ")
    )]
    UnsupportedCommand { got: String },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The delegated process ran but exited unsuccessfully. Its own output has
    /// already reached the terminal.
    #[error("TRL CLI failed! Check the logs above.")]
    Failed { command: String, status: ExitStatus },

    /// The launcher setting was empty after splitting on whitespace.
    #[error("Launcher command is empty")]
    EmptyLauncher,
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_keys_message_names_every_key() {
        let err = ConfigError::UnusedKeys { keys: vec!["c".to_string(), "extra".to_string()] };
        let message = err.to_string();
        assert!(message.contains("c, extra"), "got: {message}");
    }

    #[test]
    fn unsupported_command_lists_supported_set() {
        let err = CliError::UnsupportedCommand { got: "foo".to_string() };
        assert_eq!(
            err.to_string(),
            "Please use one of the supported commands, got foo - supported commands are sft, dpo, chat, kto, env"
        );
    }
}
