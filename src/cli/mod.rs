//! Command-line interface for trl
//!
//! Provides `sft`, `dpo`, `kto` and `chat`, which delegate to the matching
//! script, and `env`, which prints environment information for bug reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{take_config_flag, YamlConfig};
use crate::error::{CliError, ConfigError};
use crate::recipe::{resolve_chat, Recipe, ResolvedRun};

pub mod env;
pub mod git;
pub mod launch;
pub mod utils;

use launch::{LaunchPlan, LaunchSettings};

/// Fine-tune and chat with transformer models
#[derive(Parser)]
#[command(name = "trl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,

    /// Resolve and print the effective configuration instead of launching
    #[arg(long)]
    dry_run: bool,

    /// Command that launches the training scripts
    #[arg(long, env = "TRL_LAUNCHER", default_value = "accelerate launch", value_name = "CMD")]
    launcher: String,

    /// Interpreter that runs the chat script
    #[arg(long, env = "TRL_PYTHON", default_value = "python", value_name = "PROGRAM")]
    interpreter: String,

    /// Directory holding sft.py, dpo.py, kto.py and chat.py
    #[arg(long, env = "TRL_SCRIPTS_DIR", value_name = "DIR")]
    scripts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervised fine-tuning
    #[command(disable_help_flag = true, disable_version_flag = true)]
    Sft(ForwardArgs),

    /// Direct preference optimization
    #[command(disable_help_flag = true, disable_version_flag = true)]
    Dpo(ForwardArgs),

    /// Kahneman-Tversky optimization
    #[command(disable_help_flag = true, disable_version_flag = true)]
    Kto(ForwardArgs),

    /// Interactive chat with a model
    #[command(disable_help_flag = true, disable_version_flag = true)]
    Chat(ForwardArgs),

    /// Print environment information for bug reports
    Env,

    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Everything after the command name, handed to the script untouched.
#[derive(Args)]
struct ForwardArgs {
    /// Arguments forwarded to the script (see the script's --help)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

impl Cli {
    fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            launcher: self.launcher.clone(),
            interpreter: self.interpreter.clone(),
            scripts_dir: self.scripts_dir.clone().unwrap_or_else(launch::default_scripts_dir),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    dispatch(cli)
}

/// Route a parsed command line to its handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = cli.launch_settings();
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Sft(forward) => train(Recipe::Sft, &forward.args, &settings, dry_run),
        Commands::Dpo(forward) => train(Recipe::Dpo, &forward.args, &settings, dry_run),
        Commands::Kto(forward) => train(Recipe::Kto, &forward.args, &settings, dry_run),
        Commands::Chat(forward) => chat(&forward.args, &settings, dry_run),
        Commands::Env => env::run(&settings),
        Commands::External(words) => {
            let got = words.into_iter().next().unwrap_or_default();
            Err(CliError::UnsupportedCommand { got }.into())
        }
    }
}

fn train(recipe: Recipe, args: &[String], settings: &LaunchSettings, dry_run: bool) -> Result<()> {
    if dry_run {
        let run = resolve_or_exit(recipe.resolve(args), recipe.name())?;
        let plan = LaunchPlan::training(settings, recipe.name(), &expanded_arguments(args)?)?;
        return print_resolved(&run, &plan);
    }
    LaunchPlan::training(settings, recipe.name(), args)?.run()?;
    Ok(())
}

fn chat(args: &[String], settings: &LaunchSettings, dry_run: bool) -> Result<()> {
    if dry_run {
        let run = resolve_or_exit(resolve_chat(args), "chat")?;
        let plan = LaunchPlan::chat(settings, &expanded_arguments(args)?)?;
        return print_resolved(&run, &plan);
    }
    LaunchPlan::chat(settings, args)?.run()?;
    Ok(())
}

fn resolve_or_exit(resolved: crate::error::Result<ResolvedRun>, name: &str) -> Result<ResolvedRun> {
    match resolved {
        Ok(run) => Ok(run),
        // --help, --version and usage errors print and exit the clap way.
        Err(ConfigError::Args(err)) => err.exit(),
        Err(err) => Err(err).with_context(|| format!("Failed to resolve {name} configuration")),
    }
}

/// Forwarded arguments with the `--config` file spelled out as `--key value`
/// pairs ahead of the explicit ones.
fn expanded_arguments(args: &[String]) -> Result<Vec<String>> {
    let mut explicit = args.to_vec();
    let mut expanded = match take_config_flag(&mut explicit)? {
        Some(path) => YamlConfig::from_path(&path)?.to_args(),
        None => Vec::new(),
    };
    expanded.extend(explicit);
    Ok(expanded)
}

fn print_resolved(run: &ResolvedRun, plan: &LaunchPlan) -> Result<()> {
    if !run.remaining.is_empty() {
        tracing::warn!("Arguments not declared by any option: {}", run.remaining.join(" "));
    }
    let yaml = run.to_yaml().context("Failed to render resolved configuration")?;
    println!("# {}", plan.display());
    print!("{yaml}");
    Ok(())
}
