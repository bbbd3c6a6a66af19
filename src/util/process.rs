//! Subprocess execution helpers.
//!
//! All external tools are invoked with structured argument lists; remote
//! shell fragments only ever appear as a single argument handed to `ssh`.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Run a command and capture its output without failing on a non-zero exit.
pub fn run(cmd: &mut Command) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.output()
        .with_context(|| format!("run {}", program))
}

/// Run a command, capture its output, and bail on a non-zero exit.
pub fn run_checked(cmd: &mut Command) -> Result<Output> {
    let output = run(cmd)?;
    if output.status.success() {
        return Ok(output);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!("command failed: {}{}", stdout, stderr);
}

/// Run a command with inherited stdio (interactive tools like terraform).
pub fn run_interactive(cmd: &mut Command) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let status = cmd
        .status()
        .with_context(|| format!("run {}", program))?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

/// Capture trimmed stdout of a successful command, `None` otherwise.
pub fn capture_stdout(cmd: &mut Command) -> Option<String> {
    let output = cmd.output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Check whether a tool is callable on PATH.
pub fn tool_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Find all executables with the given name on PATH.
pub fn find_bins_on_path(name: &str) -> Vec<std::path::PathBuf> {
    let mut out: std::collections::BTreeSet<std::path::PathBuf> =
        std::collections::BTreeSet::new();
    let path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(name);
        if is_executable_file(&candidate) {
            out.insert(candidate);
        }
    }
    out.into_iter().collect()
}

fn is_executable_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            return (meta.permissions().mode() & 0o111) != 0;
        }
    }
    #[cfg(not(unix))]
    {
        return true;
    }
    false
}
