//! Options for the interactive chat script.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;

use super::{parse_json_object, JsonObject};
use crate::cli::utils::parse_csv;
use crate::config::OptionGroup;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
#[command(rename_all = "snake_case", next_help_heading = "Chat arguments")]
pub struct ChatArguments {
    // general settings
    /// Name of the pre-trained model
    #[arg(long, value_name = "MODEL")]
    pub model_name_or_path: String,

    /// Username to display in the chat interface
    #[arg(long)]
    pub user: Option<String>,

    /// System prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Folder to save chat history
    #[arg(long, default_value = "./chat_history/", value_name = "DIR")]
    pub save_folder: String,

    /// Example prompts, usually set from a config file
    #[arg(long, value_name = "JSON", value_parser = parse_json_object)]
    pub examples: Option<JsonObject>,

    // generation settings
    /// Maximum number of tokens to generate
    #[arg(long, default_value_t = 256)]
    pub max_new_tokens: usize,

    /// Sample outputs during generation
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = true,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub do_sample: bool,

    /// Number of beams for beam search
    #[arg(long, default_value_t = 1)]
    pub num_beams: usize,

    /// Temperature parameter for generation
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    /// Value of k for top-k sampling
    #[arg(long, default_value_t = 50)]
    pub top_k: usize,

    /// Value of p for nucleus sampling
    #[arg(long, default_value_t = 1.0)]
    pub top_p: f64,

    /// Repetition penalty
    #[arg(long, default_value_t = 1.0)]
    pub repetition_penalty: f64,

    /// EOS tokens that stop generation (comma-separated)
    #[arg(long, value_name = "TOKENS")]
    pub eos_tokens: Option<String>,

    /// EOS token ids that stop generation (comma-separated)
    #[arg(long, value_name = "IDS")]
    pub eos_token_ids: Option<String>,

    // model loading
    /// Model version to use (branch name, tag name or commit id)
    #[arg(long, default_value = "main")]
    pub model_revision: String,

    /// Trust remote code when loading a model
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub trust_remote_code: bool,

    /// Attention implementation (for example flash_attention_2)
    #[arg(long, value_name = "IMPL")]
    pub attn_implementation: Option<String>,

    /// Use 8 bit precision for the base model (LoRA only)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub load_in_8bit: bool,

    /// Use 4 bit precision for the base model (LoRA only)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub load_in_4bit: bool,

    /// Quantization type (fp4 or nf4)
    #[arg(long, default_value = "nf4")]
    pub bnb_4bit_quant_type: String,

    /// Use nested quantization
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub use_bnb_nested_quant: bool,
}

impl ChatArguments {
    /// EOS tokens split on commas, empty when unset.
    pub fn eos_token_list(&self) -> Vec<String> {
        parse_csv(self.eos_tokens.as_deref()).unwrap_or_default()
    }

    /// EOS token ids split on commas, empty when unset.
    pub fn eos_token_id_list(&self) -> Result<Vec<u32>> {
        parse_csv(self.eos_token_ids.as_deref())
            .unwrap_or_default()
            .iter()
            .map(|id| {
                id.parse::<u32>()
                    .map_err(|_| ConfigError::invalid("eos_token_ids", format!("`{id}` is not a token id")))
            })
            .collect()
    }
}

impl OptionGroup for ChatArguments {
    const NAME: &'static str = "chat";

    fn validate(&self) -> Result<()> {
        if self.load_in_8bit && self.load_in_4bit {
            return Err(ConfigError::invalid(
                "load_in_4bit",
                "8 bit and 4 bit precision cannot be used at the same time",
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::invalid("top_p", "must lie in range (0, 1]"));
        }
        if self.num_beams == 0 {
            return Err(ConfigError::invalid("num_beams", "must be positive"));
        }
        self.eos_token_id_list()?;
        Ok(())
    }
}
