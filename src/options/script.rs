//! Arguments shared by the training scripts.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;

use crate::config::{GroupRole, OptionGroup};

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "Script arguments")]
pub struct ScriptArguments {
    /// Dataset name or path
    #[arg(long, value_name = "NAME")]
    pub dataset_name: Option<String>,

    /// Dataset split to train on
    #[arg(long, default_value = "train")]
    pub dataset_train_split: String,

    /// Dataset split to evaluate on
    #[arg(long, default_value = "test")]
    pub dataset_test_split: String,

    /// Use reentrant gradient checkpointing; copied into the training
    /// arguments' gradient_checkpointing_kwargs
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub gradient_checkpointing_use_reentrant: bool,

    /// Debug argument for distributed training: ignore bias buffers
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub ignore_bias_buffers: bool,
}

impl OptionGroup for ScriptArguments {
    const NAME: &'static str = "script";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Script(self)
    }
}
