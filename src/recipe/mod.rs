//! Training recipes
//!
//! A recipe names the option groups one trainer script consumes. Resolving a
//! recipe runs the config parser over its groups and yields the effective
//! configuration that the external trainer would be constructed with.

use serde::Serialize;
use serde_json::{Map, Value};
use std::ffi::OsString;

use crate::config::{ConfigParser, OptionGroups};
use crate::error::Result;
use crate::options::{
    ChatArguments, DpoConfig, KtoConfig, ModelConfig, RewardConfig, ScriptArguments, SftConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    Sft,
    Dpo,
    Kto,
    Reward,
}

impl Recipe {
    pub const ALL: [Recipe; 4] = [Recipe::Sft, Recipe::Dpo, Recipe::Kto, Recipe::Reward];

    pub fn name(self) -> &'static str {
        match self {
            Recipe::Sft => "sft",
            Recipe::Dpo => "dpo",
            Recipe::Kto => "kto",
            Recipe::Reward => "reward",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|recipe| recipe.name() == name)
    }

    /// Parse `args` (plus any `--config` file) into this recipe's groups:
    /// script arguments, the trainer config and the model config.
    pub fn resolve<I, T>(self, args: I) -> Result<ResolvedRun>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        match self {
            Recipe::Sft => resolve_groups::<(ScriptArguments, SftConfig, ModelConfig), _, _>(self.name(), args),
            Recipe::Dpo => resolve_groups::<(ScriptArguments, DpoConfig, ModelConfig), _, _>(self.name(), args),
            Recipe::Kto => resolve_groups::<(ScriptArguments, KtoConfig, ModelConfig), _, _>(self.name(), args),
            Recipe::Reward => {
                resolve_groups::<(ScriptArguments, RewardConfig, ModelConfig), _, _>(self.name(), args)
            }
        }
    }
}

/// Resolve the chat script's arguments.
pub fn resolve_chat<I, T>(args: I) -> Result<ResolvedRun>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    resolve_groups::<(ChatArguments,), _, _>("chat", args)
}

/// The effective configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRun {
    pub recipe: String,
    /// Each parsed group keyed by its group name.
    pub groups: Map<String, Value>,
    /// Command-line tokens no group declares.
    pub remaining: Vec<String>,
}

impl ResolvedRun {
    pub fn group(&self, name: &str) -> Option<&Value> {
        self.groups.get(name)
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn resolve_groups<G, I, T>(name: &str, args: I) -> Result<ResolvedRun>
where
    G: OptionGroups,
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let output = ConfigParser::<G>::new(name).parse_known_args_and_config(args)?;
    Ok(ResolvedRun {
        recipe: name.to_string(),
        groups: output.groups.describe()?,
        remaining: output.remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recipe_names_round_trip() {
        for recipe in Recipe::ALL {
            assert_eq!(Recipe::from_name(recipe.name()), Some(recipe));
        }
        assert_eq!(Recipe::from_name("chat"), None);
    }

    #[test]
    fn test_kto_recipe_from_yaml_and_overrides() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("kto.yaml");
        fs::write(
            &path,
            "output_dir: op\n\
             warmup_ratio: 0.1\n\
             lr_scheduler_type: cosine\n\
             learning_rate: 0.0002\n\
             optim: adafactor\n\
             remove_unused_columns: false\n\
             model_name_or_path: facebook/opt-350m\n\
             dataset_name: trl-lib/kto-mix-14k\n",
        )
        .expect("write");

        let run = Recipe::Kto
            .resolve(["--config", path.to_str().expect("utf8"), "--per_device_train_batch_size", "4"])
            .expect("resolve");

        assert_eq!(run.recipe, "kto");
        let training = run.group("training").expect("training group");
        assert_eq!(training["output_dir"], "op");
        assert_eq!(training["optim"], "adafactor");
        assert_eq!(training["per_device_train_batch_size"], 4);
        assert_eq!(training["remove_unused_columns"], false);
        assert_eq!(training["gradient_checkpointing_kwargs"], json!({"use_reentrant": false}));
        assert_eq!(run.group("model").expect("model")["model_name_or_path"], "facebook/opt-350m");
        assert_eq!(run.group("script").expect("script")["dataset_name"], "trl-lib/kto-mix-14k");
    }

    #[test]
    fn test_recipe_rejects_keys_of_other_trainers() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("sft.yaml");
        fs::write(&path, "output_dir: op\ndesirable_weight: 2.0\n").expect("write");

        let err = Recipe::Sft.resolve(["--config", path.to_str().expect("utf8")]).expect_err("unused");
        match err {
            ConfigError::UnusedKeys { keys } => assert_eq!(keys, vec!["desirable_weight"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tokens_are_kept_as_remaining() {
        let run = Recipe::Dpo
            .resolve(["--output_dir", "op", "--not_an_option", "x", "--beta", "0.2"])
            .expect("resolve");
        assert_eq!(run.remaining, vec!["--not_an_option", "x"]);
        assert_eq!(run.group("training").expect("training")["beta"], 0.2);

        let yaml = run.to_yaml().expect("yaml");
        let reparsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("reparse");
        assert_eq!(reparsed["remaining"][0].as_str(), Some("--not_an_option"));
    }

    #[test]
    fn test_resolved_run_renders_yaml() {
        let run = resolve_chat(["--model_name_or_path", "gpt2", "--top_k", "10"]).expect("resolve");
        let yaml = run.to_yaml().expect("yaml");
        assert!(yaml.starts_with("recipe: chat\n"), "got: {yaml}");
        assert!(yaml.contains("top_k: 10"));
    }
}
