//! Delegating to the training and chat scripts
//!
//! The scripts run in a child process that inherits this process's terminal
//! and environment. Its exit status is the only thing inspected.

use console::style;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::utils::split_words;
use crate::error::CliError;

/// Where the delegated scripts live and what runs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Launcher command for training scripts, e.g. `accelerate launch`.
    pub launcher: String,
    /// Interpreter for the chat script.
    pub interpreter: String,
    pub scripts_dir: PathBuf,
}

impl LaunchSettings {
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(format!("{name}.py"))
    }
}

/// `scripts/` next to the running executable, or `./scripts` when the
/// executable path is unknown.
pub fn default_scripts_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("scripts")))
        .unwrap_or_else(|| PathBuf::from("scripts"))
}

/// A fully built child process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Command name used in failure messages.
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// `<launcher...> <scripts_dir>/<name>.py <forwarded...>`
    pub fn training(
        settings: &LaunchSettings,
        name: &str,
        forwarded: &[String],
    ) -> Result<Self, CliError> {
        Self::build(name, &settings.launcher, &settings.script_path(name), forwarded)
    }

    /// `<interpreter> <scripts_dir>/chat.py <forwarded...>`
    pub fn chat(settings: &LaunchSettings, forwarded: &[String]) -> Result<Self, CliError> {
        Self::build("chat", &settings.interpreter, &settings.script_path("chat"), forwarded)
    }

    fn build(
        label: &str,
        runner: &str,
        script: &Path,
        forwarded: &[String],
    ) -> Result<Self, CliError> {
        let mut words = split_words(runner);
        if words.is_empty() {
            return Err(CliError::EmptyLauncher);
        }
        let program = words.remove(0);

        let mut args = words;
        args.push(script.to_string_lossy().into_owned());
        args.extend(forwarded.iter().cloned());

        Ok(Self { label: label.to_string(), program, args })
    }

    /// The command line as one string, for logs and error reports.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the child to completion. A non-zero exit is an error; the child's
    /// own diagnostics have already been printed by then.
    pub fn run(&self) -> Result<(), CliError> {
        tracing::info!("Running: {}", self.display());

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| CliError::Spawn { program: self.program.clone(), source })?;

        if !status.success() {
            eprintln!(
                "{}",
                style(format!(
                    "TRL - {} failed! See the logs above for further details.",
                    self.label.to_uppercase()
                ))
                .red()
                .bold()
            );
            return Err(CliError::Failed { command: self.display(), status });
        }

        tracing::debug!("{} finished: {}", self.label, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn settings() -> LaunchSettings {
        LaunchSettings {
            launcher: "accelerate launch --num_processes 2".to_string(),
            interpreter: "python3".to_string(),
            scripts_dir: PathBuf::from("/opt/trl/scripts"),
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn training_plan_forwards_arguments_verbatim() {
        let forwarded = strings(&["--config", "run.yaml", "--output_dir", "my dir"]);
        let plan = LaunchPlan::training(&settings(), "kto", &forwarded).expect("plan");

        assert_eq!(plan.program, "accelerate");
        assert_eq!(
            plan.args,
            strings(&[
                "launch",
                "--num_processes",
                "2",
                "/opt/trl/scripts/kto.py",
                "--config",
                "run.yaml",
                "--output_dir",
                "my dir",
            ])
        );
        assert_eq!(plan.label, "kto");
    }

    #[test]
    fn chat_plan_uses_interpreter() {
        let plan = LaunchPlan::chat(&settings(), &strings(&["--model_name_or_path", "gpt2"]))
            .expect("plan");
        assert_eq!(plan.display(), "python3 /opt/trl/scripts/chat.py --model_name_or_path gpt2");
    }

    #[test]
    fn empty_launcher_is_rejected() {
        let mut settings = settings();
        settings.launcher = "  ".to_string();
        let err = LaunchPlan::training(&settings, "sft", &[]).expect_err("empty");
        assert!(matches!(err, CliError::EmptyLauncher));
    }

    #[cfg(unix)]
    #[test]
    fn failing_child_is_reported() {
        let plan = LaunchPlan { label: "sft".to_string(), program: "false".to_string(), args: vec![] };
        let err = plan.run().expect_err("false exits non-zero");
        assert!(matches!(err, CliError::Failed { .. }));
        assert_eq!(err.to_string(), "TRL CLI failed! Check the logs above.");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let plan = LaunchPlan {
            label: "chat".to_string(),
            program: "trl-definitely-not-installed".to_string(),
            args: vec![],
        };
        assert!(matches!(plan.run(), Err(CliError::Spawn { .. })));
    }
}
