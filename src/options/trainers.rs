//! Trainer-specific configs
//!
//! Each config embeds [`TrainingArguments`] and adds the knobs of one
//! trainer. The loss functions themselves live in the external framework.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;

use super::TrainingArguments;
use crate::config::{GroupRole, OptionGroup};
use crate::error::{ConfigError, Result};

/// Supervised fine-tuning.
#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "SFT arguments")]
pub struct SftConfig {
    #[command(flatten)]
    #[serde(flatten)]
    pub training: TrainingArguments,

    /// Dataset column holding the text to train on
    #[arg(long, default_value = "text")]
    pub dataset_text_field: String,

    /// Maximum sequence length after tokenization
    #[arg(long, default_value_t = 1024)]
    pub max_seq_length: usize,

    /// Pack several short examples into one sequence
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub packing: bool,

    /// Worker processes used to tokenize the dataset
    #[arg(long)]
    pub dataset_num_proc: Option<usize>,
}

impl OptionGroup for SftConfig {
    const NAME: &'static str = "training";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Training(&mut self.training)
    }

    fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if self.max_seq_length == 0 {
            return Err(ConfigError::invalid("max_seq_length", "must be positive"));
        }
        Ok(())
    }
}

/// Direct preference optimization.
#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "DPO arguments")]
pub struct DpoConfig {
    #[command(flatten)]
    #[serde(flatten)]
    pub training: TrainingArguments,

    /// Temperature of the implicit reward; higher stays closer to the reference model
    #[arg(long, default_value_t = 0.1)]
    pub beta: f64,

    /// Loss variant (sigmoid, hinge, ipo, ...)
    #[arg(long, default_value = "sigmoid")]
    pub loss_type: String,

    /// Label smoothing applied to the preference loss
    #[arg(long, default_value_t = 0.0)]
    pub label_smoothing: f64,

    /// Maximum length of prompt plus completion
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Maximum prompt length
    #[arg(long)]
    pub max_prompt_length: Option<usize>,
}

impl OptionGroup for DpoConfig {
    const NAME: &'static str = "training";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Training(&mut self.training)
    }

    fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if !(0.0..0.5).contains(&self.label_smoothing) {
            return Err(ConfigError::invalid("label_smoothing", "must lie in range [0, 0.5)"));
        }
        check_prompt_fits(self.max_prompt_length, self.max_length)
    }
}

/// Kahneman-Tversky optimization.
#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "KTO arguments")]
pub struct KtoConfig {
    #[command(flatten)]
    #[serde(flatten)]
    pub training: TrainingArguments,

    /// Temperature of the implicit reward
    #[arg(long, default_value_t = 0.1)]
    pub beta: f64,

    /// Weight of the loss on desirable examples
    #[arg(long, default_value_t = 1.0)]
    pub desirable_weight: f64,

    /// Weight of the loss on undesirable examples
    #[arg(long, default_value_t = 1.0)]
    pub undesirable_weight: f64,

    /// Maximum length of prompt plus completion
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Maximum prompt length
    #[arg(long)]
    pub max_prompt_length: Option<usize>,

    /// Maximum completion length
    #[arg(long)]
    pub max_completion_length: Option<usize>,
}

impl OptionGroup for KtoConfig {
    const NAME: &'static str = "training";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Training(&mut self.training)
    }

    fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if self.desirable_weight <= 0.0 {
            return Err(ConfigError::invalid("desirable_weight", "must be positive"));
        }
        if self.undesirable_weight <= 0.0 {
            return Err(ConfigError::invalid("undesirable_weight", "must be positive"));
        }
        check_prompt_fits(self.max_prompt_length, self.max_length)
    }
}

/// Reward model training on chosen/rejected pairs.
#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "Reward arguments")]
pub struct RewardConfig {
    #[command(flatten)]
    #[serde(flatten)]
    pub training: TrainingArguments,

    /// Maximum length of a tokenized sequence
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    /// Coefficient pushing rewards towards zero mean
    #[arg(long)]
    pub center_rewards_coefficient: Option<f64>,
}

impl OptionGroup for RewardConfig {
    const NAME: &'static str = "training";

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Training(&mut self.training)
    }

    fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if self.max_length == 0 {
            return Err(ConfigError::invalid("max_length", "must be positive"));
        }
        Ok(())
    }
}

fn check_prompt_fits(max_prompt_length: Option<usize>, max_length: Option<usize>) -> Result<()> {
    match (max_prompt_length, max_length) {
        (Some(prompt), Some(total)) if prompt > total => Err(ConfigError::invalid(
            "max_prompt_length",
            format!("{prompt} exceeds max_length {total}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    #[test]
    fn test_kto_config_embeds_training_arguments() {
        let (kto,) = ConfigParser::<(KtoConfig,)>::new("kto")
            .parse_args_and_config([
                "--output_dir",
                "op",
                "--learning_rate",
                "2e-4",
                "--lr_scheduler_type",
                "cosine",
                "--desirable_weight",
                "1.33",
            ])
            .expect("parse");
        assert_eq!(kto.training.output_dir, "op");
        assert_eq!(kto.training.lr_scheduler_type, "cosine");
        assert!((kto.training.learning_rate - 2e-4).abs() < 1e-12);
        assert!((kto.desirable_weight - 1.33).abs() < 1e-12);
        assert!((kto.beta - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_kto_rejects_non_positive_weight() {
        let err = ConfigParser::<(KtoConfig,)>::new("kto")
            .parse_args_and_config(["--output_dir", "op", "--undesirable_weight", "0"])
            .expect_err("invalid");
        assert!(err.to_string().contains("undesirable_weight"));
    }

    #[test]
    fn test_dpo_prompt_longer_than_sequence() {
        let err = ConfigParser::<(DpoConfig,)>::new("dpo")
            .parse_args_and_config(["--output_dir", "op", "--max_length", "128", "--max_prompt_length", "256"])
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "max_prompt_length"));
    }

    #[test]
    fn test_trainer_validation_covers_training_arguments() {
        let err = ConfigParser::<(RewardConfig,)>::new("reward")
            .parse_args_and_config(["--output_dir", "op", "--warmup_ratio", "2"])
            .expect_err("invalid");
        assert!(err.to_string().contains("warmup_ratio"));
    }

    #[test]
    fn test_sft_serializes_flat() {
        let (sft,) = ConfigParser::<(SftConfig,)>::new("sft")
            .parse_args_and_config(["--output_dir", "op", "--packing"])
            .expect("parse");
        let value = serde_json::to_value(&sft).expect("json");
        assert_eq!(value["output_dir"], "op");
        assert_eq!(value["packing"], true);
        assert_eq!(value["dataset_text_field"], "text");
    }
}
