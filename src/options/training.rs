//! Generic training arguments shared by every trainer.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;

use super::{parse_json_object, JsonObject};
use crate::config::{GroupRole, OptionGroup};
use crate::error::{ConfigError, Result};

/// Hyperparameters and bookkeeping handed to the external trainer.
#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "Training arguments")]
pub struct TrainingArguments {
    /// Directory where checkpoints and the final model are written
    #[arg(long, value_name = "DIR")]
    pub output_dir: String,

    /// Overwrite the content of the output directory
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub overwrite_output_dir: bool,

    /// Run evaluation on the eval split
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub do_eval: bool,

    /// Batch size per device during training
    #[arg(long, default_value_t = 8)]
    pub per_device_train_batch_size: usize,

    /// Batch size per device during evaluation
    #[arg(long, default_value_t = 8)]
    pub per_device_eval_batch_size: usize,

    /// Number of update steps to accumulate before a backward pass
    #[arg(long, default_value_t = 1)]
    pub gradient_accumulation_steps: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub learning_rate: f64,

    /// Weight decay applied to all layers except bias and norm weights
    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f64,

    /// Total number of training epochs
    #[arg(long, default_value_t = 3.0)]
    pub num_train_epochs: f64,

    /// Total number of training steps; overrides epochs when positive
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub max_steps: i64,

    /// Learning rate scheduler
    #[arg(long, default_value = "linear")]
    pub lr_scheduler_type: String,

    /// Fraction of total steps used for linear warmup
    #[arg(long, default_value_t = 0.0)]
    pub warmup_ratio: f64,

    /// Number of warmup steps; overrides the warmup ratio
    #[arg(long, default_value_t = 0)]
    pub warmup_steps: usize,

    /// Log every N update steps
    #[arg(long, default_value_t = 500)]
    pub logging_steps: usize,

    /// Evaluate every N update steps; defaults to the logging cadence
    #[arg(long)]
    pub eval_steps: Option<usize>,

    /// Save a checkpoint every N update steps
    #[arg(long, default_value_t = 500)]
    pub save_steps: usize,

    /// Random seed set at the beginning of training
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Optimizer name
    #[arg(long, default_value = "adamw")]
    pub optim: String,

    /// Use bf16 mixed precision
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub bf16: bool,

    /// Use fp16 mixed precision
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub fp16: bool,

    /// Drop dataset columns the model forward does not accept
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = true,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub remove_unused_columns: bool,

    /// Integrations to report results and logs to
    #[arg(long, num_args = 1.., value_name = "NAME")]
    pub report_to: Vec<String>,

    /// Trade compute for memory by recomputing activations
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub gradient_checkpointing: bool,

    /// Keyword arguments for gradient checkpointing, as a JSON object
    #[arg(long, value_name = "JSON", value_parser = parse_json_object)]
    pub gradient_checkpointing_kwargs: Option<JsonObject>,
}

impl TrainingArguments {
    /// Eval cadence, falling back to the logging cadence.
    pub fn effective_eval_steps(&self) -> usize {
        self.eval_steps.unwrap_or(self.logging_steps)
    }
}

impl OptionGroup for TrainingArguments {
    const NAME: &'static str = "training";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Training(self)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.warmup_ratio) {
            return Err(ConfigError::invalid("warmup_ratio", "must lie in range [0, 1]"));
        }
        if self.per_device_train_batch_size == 0 {
            return Err(ConfigError::invalid("per_device_train_batch_size", "must be positive"));
        }
        if self.gradient_accumulation_steps == 0 {
            return Err(ConfigError::invalid("gradient_accumulation_steps", "must be positive"));
        }
        if self.bf16 && self.fp16 {
            return Err(ConfigError::invalid("fp16", "cannot be combined with bf16"));
        }
        Ok(())
    }
}
