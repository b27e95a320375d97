//! `trl env`: environment information for bug reports

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::Command;
use std::time::Duration;

use super::launch::LaunchSettings;
use super::utils::split_words;

const NOT_INSTALLED: &str = "not installed";

/// Commit the binary was built from, recorded by the build script.
pub const BUILD_COMMIT: Option<&str> = option_env!("TRL_GIT_COMMIT");

/// Ordered `key: value` pairs describing this installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvReport {
    entries: Vec<(String, String)>,
}

impl EnvReport {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// One `- key: value` line per entry.
    pub fn format_entries(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("- {key}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self) -> String {
        format!(
            "\nCopy-paste the following information when reporting an issue:\n\n{}\n",
            self.format_entries()
        )
    }
}

pub fn run(settings: &LaunchSettings) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Collecting environment information...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = collect(settings);
    spinner.finish_and_clear();

    println!("{}", report.render());
    Ok(())
}

/// Probe the platform, this build, the interpreter and the launcher.
pub fn collect(settings: &LaunchSettings) -> EnvReport {
    let python = probe_version(&split_words(&settings.interpreter));
    let launcher = probe_version(&split_words(&settings.launcher).into_iter().take(1).collect::<Vec<_>>());

    let scripts = if settings.scripts_dir.is_dir() {
        settings.scripts_dir.display().to_string()
    } else {
        format!("{} (missing)", settings.scripts_dir.display())
    };

    EnvReport::new(vec![
        ("Platform".to_string(), format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)),
        ("trl-cli version".to_string(), version_label(env!("CARGO_PKG_VERSION"), BUILD_COMMIT)),
        ("Python version".to_string(), python.unwrap_or_else(|| NOT_INSTALLED.to_string())),
        ("Launcher version".to_string(), launcher.unwrap_or_else(|| NOT_INSTALLED.to_string())),
        ("Scripts directory".to_string(), scripts),
    ])
}

/// `1.2.3` or `1.2.3+abcdef1` when built from a git checkout.
pub fn version_label(version: &str, commit: Option<&str>) -> String {
    match commit {
        Some(hash) => format!("{version}+{}", short_hash(hash)),
        None => version.to_string(),
    }
}

pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// First non-empty line printed by `<command...> --version`.
pub fn probe_version(command: &[String]) -> Option<String> {
    let (program, rest) = command.split_first()?;
    let output = Command::new(program).args(rest).arg("--version").output().ok()?;
    if !output.status.success() {
        tracing::debug!("{program} --version exited with {}", output.status);
        return None;
    }

    // Older interpreters print their version on stderr.
    [output.stdout, output.stderr]
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .flat_map(|text| text.lines().map(str::trim).map(str::to_string).collect::<Vec<_>>())
        .find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines() {
        let report = EnvReport::new(vec![
            ("Platform".to_string(), "linux-x86_64".to_string()),
            ("trl-cli version".to_string(), version_label("0.1.0", Some("0123456789abcdef"))),
            ("Python version".to_string(), NOT_INSTALLED.to_string()),
        ]);
        insta::assert_snapshot!(report.format_entries(), @r"
        - Platform: linux-x86_64
        - trl-cli version: 0.1.0+0123456
        - Python version: not installed
        ");
        assert!(report.render().starts_with("\nCopy-paste the following information"));
    }

    #[test]
    fn test_version_label_without_commit() {
        assert_eq!(version_label("0.1.0", None), "0.1.0");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_report_uses_build_commit() {
        let settings = LaunchSettings {
            launcher: "trl-definitely-not-installed".to_string(),
            interpreter: "trl-definitely-not-installed".to_string(),
            scripts_dir: std::path::PathBuf::from("/nonexistent/scripts"),
        };
        let report = collect(&settings);
        let version = &report.entries()[1];
        assert_eq!(version.0, "trl-cli version");
        assert_eq!(version.1, version_label(env!("CARGO_PKG_VERSION"), BUILD_COMMIT));
        if let Some(hash) = BUILD_COMMIT {
            assert_eq!(hash.len(), 40);
            assert!(version.1.ends_with(&hash[..7]));
        }
        assert_eq!(report.entries()[2].1, NOT_INSTALLED);
        assert_eq!(report.entries()[4].1, "/nonexistent/scripts (missing)");
    }

    #[test]
    fn test_missing_program_is_not_installed() {
        assert_eq!(probe_version(&["trl-definitely-not-installed".to_string()]), None);
        assert_eq!(probe_version(&[]), None);
    }
}
