//! Model selection and loading options.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;

use crate::config::OptionGroup;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "Model arguments")]
pub struct ModelConfig {
    /// Model checkpoint to start training from
    #[arg(long, value_name = "MODEL")]
    pub model_name_or_path: Option<String>,

    /// Model version to use (branch name, tag name or commit id)
    #[arg(long, default_value = "main")]
    pub model_revision: String,

    /// Dtype to load the model under (auto, bfloat16, float16, float32)
    #[arg(long, value_name = "DTYPE")]
    pub torch_dtype: Option<String>,

    /// Trust remote code when loading a model
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub trust_remote_code: bool,

    /// Attention implementation (for example flash_attention_2)
    #[arg(long, value_name = "IMPL")]
    pub attn_implementation: Option<String>,

    /// Train a PEFT adapter instead of the full model
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub use_peft: bool,

    /// LoRA rank
    #[arg(long, default_value_t = 16)]
    pub lora_r: u32,

    /// LoRA alpha
    #[arg(long, default_value_t = 32)]
    pub lora_alpha: u32,

    /// LoRA dropout
    #[arg(long, default_value_t = 0.05)]
    pub lora_dropout: f64,

    /// LoRA target modules ("all-linear" targets every linear layer)
    #[arg(long, num_args = 1.., value_name = "MODULE")]
    pub lora_target_modules: Vec<String>,

    /// Extra modules to unfreeze and train alongside the adapter
    #[arg(long, num_args = 1.., value_name = "MODULE")]
    pub lora_modules_to_save: Vec<String>,

    /// Task type passed to the LoRA config
    #[arg(long, default_value = "CAUSAL_LM")]
    pub lora_task_type: String,

    /// Load the base model in 8-bit precision (LoRA only)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub load_in_8bit: bool,

    /// Load the base model in 4-bit precision (LoRA only)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub load_in_4bit: bool,

    /// 4-bit quantization type (fp4 or nf4)
    #[arg(long, default_value = "nf4")]
    pub bnb_4bit_quant_type: String,

    /// Use nested quantization
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub use_bnb_nested_quant: bool,
}

impl ModelConfig {
    /// True when the base model is loaded quantized.
    pub fn is_quantized(&self) -> bool {
        self.load_in_8bit || self.load_in_4bit
    }
}

impl OptionGroup for ModelConfig {
    const NAME: &'static str = "model";

    fn validate(&self) -> Result<()> {
        if self.load_in_8bit && self.load_in_4bit {
            return Err(ConfigError::invalid(
                "load_in_4bit",
                "8 bit and 4 bit precision cannot be used at the same time",
            ));
        }
        if !matches!(self.bnb_4bit_quant_type.as_str(), "fp4" | "nf4") {
            return Err(ConfigError::invalid("bnb_4bit_quant_type", "must be fp4 or nf4"));
        }
        if self.is_quantized() && !self.use_peft {
            tracing::warn!("Quantized loading only works with LoRA; pass --use_peft to train an adapter");
        }
        Ok(())
    }
}
