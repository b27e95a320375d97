//! Option groups filled by the config parser
//!
//! Each group is a clap `Args` struct whose snake_case field names double as
//! command-line flags (`--learning_rate`) and YAML keys (`learning_rate:`).

pub mod chat;
pub mod model;
pub mod script;
pub mod trainers;
pub mod training;

pub use chat::ChatArguments;
pub use model::ModelConfig;
pub use script::ScriptArguments;
pub use trainers::{DpoConfig, KtoConfig, RewardConfig, SftConfig};
pub use training::TrainingArguments;

/// A JSON object option value.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Value parser for options that take a JSON object.
pub fn parse_json_object(raw: &str) -> Result<JsonObject, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}
