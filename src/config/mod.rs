//! Configuration loading and merging
//!
//! Combines command-line arguments with an optional YAML config file into
//! typed option groups, with precedence CLI > config file > declared defaults.

pub mod defaults;
pub mod groups;
pub mod loader;
pub mod parser;

pub use defaults::{install_defaults, InstalledDefaults};
pub use groups::{GroupRole, OptionGroup, OptionGroups};
pub use loader::{extract_env_and_settings, settings_to_args, EnvOverrides, YamlConfig};
pub use parser::{take_config_flag, ConfigParser, ParseOutput};
