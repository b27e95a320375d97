//! trl-cli: command-line front end for transformer fine-tuning recipes
//!
//! Merges YAML configuration files with command-line arguments into typed
//! option groups, and dispatches the `sft`, `dpo`, `kto`, `chat` and `env`
//! commands.

pub mod cli;
pub mod config;
pub mod error;
pub mod options;
pub mod recipe;
