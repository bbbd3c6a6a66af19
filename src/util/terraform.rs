//! Terraform invocation wrapper.

use crate::util::{log, process};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Options for `terraform apply` / `terraform destroy`.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Restrict the run to a single resource/module address.
    pub target: Option<String>,
    /// Pass `-refresh=false` (used when remote state is known stale).
    pub skip_refresh: bool,
}

/// Terraform runner bound to a working directory.
pub struct Terraform {
    cwd: PathBuf,
}

impl Terraform {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("terraform");
        cmd.current_dir(&self.cwd);
        cmd
    }

    pub fn init(&self, upgrade: bool) -> Result<()> {
        log::step("Initializing Terraform...");
        let mut cmd = self.command();
        cmd.arg("init");
        if upgrade {
            cmd.arg("-upgrade");
        }
        process::run_interactive(&mut cmd).context("terraform init")?;
        log::info("Terraform initialized");
        Ok(())
    }

    pub fn apply(&self, options: &ApplyOptions) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("apply");
        if let Some(target) = &options.target {
            cmd.arg("-target").arg(target);
        }
        cmd.arg("-auto-approve");
        if options.skip_refresh {
            cmd.arg("-refresh=false");
        }
        process::run_interactive(&mut cmd).context("terraform apply")
    }

    pub fn destroy(&self) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("destroy").arg("-auto-approve");
        process::run_interactive(&mut cmd).context("terraform destroy")
    }

    /// Read a single output value, `None` when the output does not exist or
    /// terraform fails (e.g. nothing applied yet).
    ///
    /// Uses `-json` rather than `-raw`: on an empty state terraform exits 0
    /// and prints a "No outputs found" warning to stdout, which `-raw` would
    /// hand back as the value. A JSON scalar is unambiguous.
    pub fn output(&self, name: &str) -> Option<String> {
        let mut cmd = self.command();
        cmd.arg("output").arg("-no-color").arg("-json").arg(name);
        let stdout = process::capture_stdout(&mut cmd)?;
        parse_output_value(&stdout)
    }

    /// Print all outputs for the operator.
    pub fn show_outputs(&self) {
        let mut cmd = self.command();
        cmd.arg("output");
        if process::run_interactive(&mut cmd).is_err() {
            log::warn("could not read terraform outputs");
        }
    }

    /// Run tflint over the project.
    pub fn lint(&self) -> Result<()> {
        log::step("Running tflint...");
        let mut cmd = Command::new("tflint");
        cmd.current_dir(&self.cwd)
            .arg("--recursive")
            .arg("--format")
            .arg("compact");
        process::run_interactive(&mut cmd).context("tflint")?;
        log::info("tflint passed");
        Ok(())
    }
}

/// Interpret `terraform output -json <name>` stdout as a scalar value.
/// Anything that is not valid JSON (warning banners) or not a scalar
/// yields `None`.
fn parse_output_value(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_value_string() {
        assert_eq!(
            parse_output_value("\"10.0.0.5\"\n").as_deref(),
            Some("10.0.0.5")
        );
    }

    #[test]
    fn test_output_value_scalars() {
        assert_eq!(parse_output_value("8080").as_deref(), Some("8080"));
        assert_eq!(parse_output_value("true").as_deref(), Some("true"));
    }

    #[test]
    fn test_output_value_rejects_warning_banner() {
        let banner = "\nWarning: No outputs found\n\nThe state file either has no outputs \
                      defined, or all the defined\noutputs are empty.\n";
        assert!(parse_output_value(banner).is_none());
    }

    #[test]
    fn test_output_value_rejects_empty_and_compound() {
        assert!(parse_output_value("\"\"").is_none());
        assert!(parse_output_value("").is_none());
        assert!(parse_output_value("{\"a\": 1}").is_none());
    }
}
