//! Combined command-line and YAML argument parsing

use clap::{Arg, ArgAction, Command};
use serde_yaml::Mapping;
use std::collections::HashSet;
use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::PathBuf;

use super::defaults::{install_defaults, CONFIG_ARG_ID};
use super::groups::OptionGroups;
use super::loader::{extract_env_and_settings, value_to_text};
use crate::error::{ConfigError, Result};

const CONFIG_FLAG: &str = "--config";

/// Parsed groups plus whatever the groups did not consume.
#[derive(Debug)]
pub struct ParseOutput<G> {
    pub groups: G,
    /// Unknown command-line tokens, then unused config settings as
    /// `key: value` entries.
    pub remaining: Vec<String>,
}

/// Parses a tuple of option groups from command-line tokens and an optional
/// `--config <path>` YAML file.
///
/// Precedence is command line, then config file, then declared defaults.
pub struct ConfigParser<G> {
    name: String,
    ignore_extra_args: bool,
    _groups: PhantomData<G>,
}

impl<G: OptionGroups> ConfigParser<G> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ignore_extra_args: false, _groups: PhantomData }
    }

    /// Tolerate config settings that no declared option consumes.
    pub fn ignore_extra_args(mut self, ignore: bool) -> Self {
        self.ignore_extra_args = ignore;
        self
    }

    /// The declared command before any config defaults are installed.
    pub fn command(&self) -> Command {
        let command = Command::new(self.name.clone()).no_binary_name(true).arg(
            Arg::new(CONFIG_ARG_ID)
                .long("config")
                .value_name("FILE")
                .action(ArgAction::Set)
                .help("YAML file whose settings become option defaults; its `env` block is exported"),
        );
        G::augment(command)
    }

    /// Parse the current process arguments (program name excluded).
    pub fn parse_env(&self) -> Result<G> {
        self.parse_args_and_config(std::env::args_os().skip(1))
    }

    /// Parse `args` into the declared groups. Every token must be understood.
    pub fn parse_args_and_config<I, T>(&self, args: I) -> Result<G>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.parse_inner(args, false).map(|output| output.groups)
    }

    /// Like [`parse_args_and_config`](Self::parse_args_and_config), but unknown
    /// command-line tokens and (when extra args are ignored) unused config
    /// settings are returned instead of failing.
    pub fn parse_known_args_and_config<I, T>(&self, args: I) -> Result<ParseOutput<G>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.parse_inner(args, true)
    }

    fn parse_inner<I, T>(&self, args: I, keep_remaining: bool) -> Result<ParseOutput<G>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut tokens: Vec<String> =
            args.into_iter().map(|arg| arg.into().to_string_lossy().into_owned()).collect();

        let settings = match take_config_flag(&mut tokens)? {
            Some(path) => extract_env_and_settings(&path)?,
            None => Mapping::new(),
        };

        let installed = install_defaults(self.command(), &settings);
        let command = installed.command;

        let (known, mut remaining) = if keep_remaining {
            split_known_tokens(&command, tokens)
        } else {
            (tokens, Vec::new())
        };

        let matches = command.try_get_matches_from(known)?;
        let mut groups = G::from_matches(&matches)?;
        groups.validate()?;
        groups.post_process();

        if !installed.unused.is_empty() {
            if !self.ignore_extra_args {
                let keys = installed.unused.into_iter().map(|(key, _)| key).collect();
                return Err(ConfigError::UnusedKeys { keys });
            }
            if keep_remaining {
                remaining.extend(
                    installed
                        .unused
                        .iter()
                        .map(|(key, value)| format!("{}: {}", key, value_to_text(value))),
                );
            } else {
                let keys: Vec<&str> = installed.unused.iter().map(|(key, _)| key.as_str()).collect();
                tracing::debug!("Ignoring unused config settings: {}", keys.join(", "));
            }
        }

        Ok(ParseOutput { groups, remaining })
    }
}

/// Remove `--config <path>` (or `--config=<path>`) from `tokens`, wherever it
/// appears, and return the path. The flag may appear at most once.
pub fn take_config_flag(tokens: &mut Vec<String>) -> Result<Option<PathBuf>> {
    let Some(index) = tokens.iter().position(|token| is_config_flag(token)) else {
        return Ok(None);
    };

    let flag = tokens.remove(index);
    let path = if let Some(path) = flag.strip_prefix("--config=") {
        if path.is_empty() {
            return Err(ConfigError::MissingConfigPath);
        }
        PathBuf::from(path)
    } else {
        if index >= tokens.len() {
            return Err(ConfigError::MissingConfigPath);
        }
        PathBuf::from(tokens.remove(index))
    };

    if tokens.iter().any(|token| is_config_flag(token)) {
        return Err(ConfigError::DuplicateConfigFlag);
    }
    Ok(Some(path))
}

fn is_config_flag(token: &str) -> bool {
    token == CONFIG_FLAG || token.starts_with("--config=")
}

/// Split tokens into those addressed to a declared option and the rest.
///
/// A value follows the flag before it; values before any flag, and
/// everything after `--`, are unknown.
pub fn split_known_tokens(command: &Command, tokens: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut longs: HashSet<String> =
        command.get_arguments().filter_map(|arg| arg.get_long()).map(str::to_string).collect();
    longs.insert("help".to_string());
    let mut shorts: HashSet<char> = command.get_arguments().filter_map(|arg| arg.get_short()).collect();
    shorts.insert('h');

    let mut known = Vec::new();
    let mut unknown = Vec::new();
    let mut to_known = false;
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        if token == "--" {
            unknown.push(token);
            unknown.extend(iter.by_ref());
            break;
        }

        if let Some(flag) = token.strip_prefix("--") {
            let name = flag.split('=').next().unwrap_or(flag);
            to_known = longs.contains(name);
        } else if is_short_flag(&token) {
            to_known = token.chars().nth(1).map(|c| shorts.contains(&c)).unwrap_or(false);
        }

        if to_known {
            known.push(token);
        } else {
            unknown.push(token);
        }
    }

    (known, unknown)
}

fn is_short_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}
