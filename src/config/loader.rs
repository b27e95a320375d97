//! YAML config file loading
//!
//! A config file is a mapping of option names to values. The reserved `env`
//! key holds environment variables that are exported before anything else is
//! parsed; it never reaches the option groups.

use crate::error::{ConfigError, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reserved top-level key holding environment variables.
pub const ENV_KEY: &str = "env";

/// Environment variables taken from a config file's `env` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    vars: Vec<(String, String)>,
}

impl EnvOverrides {
    fn from_mapping(mapping: &Mapping) -> Self {
        let vars = mapping.iter().map(|(key, value)| (key_to_text(key), value_to_text(value))).collect();
        Self { vars }
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Export every variable into the process environment.
    ///
    /// This mutates process-wide state and cannot be undone. Call it once,
    /// at startup, before anything else reads the environment. It is not
    /// reentrant.
    pub fn apply(&self) {
        for (key, value) in &self.vars {
            std::env::set_var(key, value);
        }
        if !self.vars.is_empty() {
            let names: Vec<&str> = self.vars.iter().map(|(key, _)| key.as_str()).collect();
            tracing::debug!("Exported environment variables from config: {}", names.join(", "));
        }
    }
}

/// A parsed config file split into its `env` block and the option settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlConfig {
    pub env: EnvOverrides,
    pub settings: Mapping,
}

impl YamlConfig {
    /// Read and parse a config file without touching the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read { path: path.to_path_buf(), source },
        })?;
        Self::parse(&content, path)
    }

    /// Parse config text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(content)
            .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })?;

        let mut settings = match raw {
            Value::Mapping(mapping) => mapping,
            // An empty document carries no settings.
            Value::Null => Mapping::new(),
            _ => return Err(ConfigError::NotAMapping(path.to_path_buf())),
        };

        let env = match settings.remove(ENV_KEY) {
            None => EnvOverrides::default(),
            Some(Value::Mapping(vars)) => EnvOverrides::from_mapping(&vars),
            Some(_) => return Err(ConfigError::EnvNotAMapping(path.to_path_buf())),
        };

        Ok(Self { env, settings })
    }

    /// The settings as the `--key value` tokens a script would receive.
    pub fn to_args(&self) -> Vec<String> {
        settings_to_args(&self.settings)
    }
}

/// Render settings as command-line tokens, one `--key value` pair per entry.
///
/// Sequences and mappings become a single JSON token; empty ones, and null
/// values, are left out.
pub fn settings_to_args(settings: &Mapping) -> Vec<String> {
    let mut args = Vec::with_capacity(settings.len() * 2);
    for (key, value) in settings {
        let skip = match value {
            Value::Null => true,
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(entries) => entries.is_empty(),
            _ => false,
        };
        if skip {
            continue;
        }
        args.push(format!("--{}", key_to_text(key)));
        args.push(value_to_text(value));
    }
    args
}

/// Load `path`, export its `env` block, and return the remaining settings.
///
/// The environment is only written once the whole file has been validated, so
/// a malformed file leaves the environment untouched.
pub fn extract_env_and_settings(path: &Path) -> Result<Mapping> {
    let config = YamlConfig::from_path(path)?;
    config.env.apply();
    tracing::debug!("Loaded {} setting(s) from {}", config.settings.len(), path.display());
    Ok(config.settings)
}

/// Render a YAML value as the text an option or environment variable sees.
///
/// Scalars use their plain YAML spelling, null becomes the empty string and
/// nested values become inline JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Tagged(tagged) => value_to_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => to_inline_json(value),
    }
}

/// Render a mapping key. Non-string keys fall back to their value text.
pub fn key_to_text(key: &Value) -> String {
    key.as_str().map(str::to_string).unwrap_or_else(|| value_to_text(key))
}

fn to_inline_json(value: &Value) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        // JSON needs string keys; keep the flow-style YAML otherwise.
        Err(_) => serde_yaml::to_string(value).unwrap_or_default().trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn test_env_block_is_exported_and_removed() {
        let tmp = TempDir::new().expect("tmp");
        let path = write_config(
            &tmp,
            "env:\n  TRL_LOADER_TEST_TOKEN: abc\n  TRL_LOADER_TEST_WORKERS: 4\n  TRL_LOADER_TEST_FLAG: true\nlearning_rate: 0.001\n",
        );

        let settings = extract_env_and_settings(&path).expect("settings");

        assert_eq!(std::env::var("TRL_LOADER_TEST_TOKEN").as_deref(), Ok("abc"));
        assert_eq!(std::env::var("TRL_LOADER_TEST_WORKERS").as_deref(), Ok("4"));
        assert_eq!(std::env::var("TRL_LOADER_TEST_FLAG").as_deref(), Ok("true"));
        assert!(settings.get(ENV_KEY).is_none());
        assert!(settings.get("learning_rate").is_some());
    }

    #[test]
    fn test_env_list_is_rejected_without_touching_environment() {
        let tmp = TempDir::new().expect("tmp");
        let path = write_config(&tmp, "env:\n  - TRL_LOADER_TEST_LISTED\nseed: 1\n");

        let err = extract_env_and_settings(&path).expect_err("list env must fail");
        assert!(matches!(err, ConfigError::EnvNotAMapping(_)), "got: {err:?}");
        assert!(std::env::var("TRL_LOADER_TEST_LISTED").is_err());
    }

    #[test]
    fn test_env_scalar_is_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let path = write_config(&tmp, "env: TRL_LOADER_TEST_SCALAR=1\n");

        let err = YamlConfig::from_path(&path).expect_err("scalar env must fail");
        assert!(matches!(err, ConfigError::EnvNotAMapping(_)));
        assert!(std::env::var("TRL_LOADER_TEST_SCALAR").is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let tmp = TempDir::new().expect("tmp");
        let err = YamlConfig::from_path(&tmp.path().join("absent.yaml")).expect_err("missing");
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let tmp = TempDir::new().expect("tmp");
        let path = write_config(&tmp, "learning_rate: [1, 2\n");
        let err = YamlConfig::from_path(&path).expect_err("bad yaml");
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_top_level_sequence_is_rejected() {
        let err = YamlConfig::parse("- a\n- b\n", Path::new("list.yaml")).expect_err("list");
        assert!(matches!(err, ConfigError::NotAMapping(_)));
    }

    #[test]
    fn test_empty_document_has_no_settings() {
        let config = YamlConfig::parse("", Path::new("empty.yaml")).expect("empty");
        assert!(config.settings.is_empty());
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_parse_keeps_setting_order() {
        let config =
            YamlConfig::parse("b: 5\nenv:\n  X: y\na: 1\n", Path::new("order.yaml")).expect("parse");
        let keys: Vec<String> = config.settings.keys().map(key_to_text).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(config.env.vars(), &[("X".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_value_to_text_renders_nested_values_as_json() {
        let value: Value = serde_yaml::from_str("{use_reentrant: false}").expect("yaml");
        assert_eq!(value_to_text(&value), r#"{"use_reentrant":false}"#);

        let list: Value = serde_yaml::from_str("[q_proj, v_proj]").expect("yaml");
        assert_eq!(value_to_text(&list), r#"["q_proj","v_proj"]"#);

        assert_eq!(value_to_text(&Value::Null), "");
    }

    #[test]
    fn test_settings_render_as_arguments() {
        let config = YamlConfig::parse(
            "output_dir: op\n\
             learning_rate: 0.5\n\
             packing: true\n\
             report_to: []\n\
             lora_target_modules: [q_proj, v_proj]\n\
             gradient_checkpointing_kwargs: {}\n\
             examples:\n  llama: {text: hi}\n\
             eval_steps: null\n\
             env:\n  WANDB_PROJECT: x\n",
            Path::new("args.yaml"),
        )
        .expect("parse");

        assert_eq!(
            config.to_args(),
            vec![
                "--output_dir",
                "op",
                "--learning_rate",
                "0.5",
                "--packing",
                "true",
                "--lora_target_modules",
                r#"["q_proj","v_proj"]"#,
                "--examples",
                r#"{"llama":{"text":"hi"}}"#,
            ]
        );
    }
}
