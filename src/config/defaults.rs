//! Installing config settings as option defaults
//!
//! Settings from a YAML file become the defaults of the matching declared
//! options, so anything passed explicitly on the command line still wins.

use clap::{Arg, ArgAction, Command};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

use super::loader::{key_to_text, value_to_text};

/// Id of the help-only `--config` argument. It is stripped before parsing and
/// never takes a default from the file.
pub(crate) const CONFIG_ARG_ID: &str = "config";

/// Result of [`install_defaults`].
#[derive(Debug)]
pub struct InstalledDefaults {
    /// The command with file settings installed as defaults.
    pub command: Command,
    /// Settings that matched no declared option, in file order.
    pub unused: Vec<(String, Value)>,
}

impl InstalledDefaults {
    pub fn unused_keys(&self) -> Vec<String> {
        self.unused.iter().map(|(key, _)| key.clone()).collect()
    }
}

/// Return `command` with every matching option defaulted from `settings` and
/// no longer required.
///
/// `settings` is left untouched; keys without a declared option are handed
/// back in [`InstalledDefaults::unused`].
pub fn install_defaults(command: Command, settings: &Mapping) -> InstalledDefaults {
    let multi_valued: HashSet<String> =
        command.get_arguments().filter(|arg| takes_many(arg)).map(|arg| arg.get_id().to_string()).collect();
    let declared: HashSet<String> = command
        .get_arguments()
        .map(|arg| arg.get_id().to_string())
        .filter(|id| id != CONFIG_ARG_ID)
        .collect();

    let mut command = command;
    let mut unused = Vec::new();
    let mut installed = 0usize;

    for (key, value) in settings {
        let name = key_to_text(key);
        if !declared.contains(&name) {
            unused.push((name, value.clone()));
            continue;
        }

        let defaults = default_values(value, multi_valued.contains(&name));
        command = command.mut_arg(&name, |arg| arg.required(false).default_values(defaults));
        installed += 1;
    }

    tracing::debug!("Installed {} config default(s), {} unused", installed, unused.len());
    InstalledDefaults { command, unused }
}

fn takes_many(arg: &Arg) -> bool {
    matches!(arg.get_action(), ArgAction::Append)
        || arg.get_num_args().map(|range| range.max_values() > 1).unwrap_or(false)
}

/// Text defaults for one setting. Null clears the default; a sequence fans
/// out into one value per element when the option accepts several.
fn default_values(value: &Value, multi_valued: bool) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) if multi_valued => items.iter().map(value_to_text).collect(),
        Value::Tagged(tagged) => default_values(&tagged.value, multi_valued),
        other => vec![value_to_text(other)],
    }
}
