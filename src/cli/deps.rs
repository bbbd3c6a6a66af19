//! System dependency checks with optional apt-based installation.

use crate::cli::CliContext;
use crate::util::{log, process};
use anyhow::{bail, Result};
use clap::Args;
use std::process::Command;

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Install missing apt-installable packages
    #[arg(long)]
    pub install: bool,
}

/// A required tool: either apt-installable or manual-install with a hint.
struct Dependency {
    tool: &'static str,
    apt_package: Option<&'static str>,
    hint: &'static str,
}

const DEPENDENCIES: &[Dependency] = &[
    Dependency {
        tool: "terraform",
        apt_package: None,
        hint: "https://developer.hashicorp.com/terraform/install",
    },
    Dependency {
        tool: "tflint",
        apt_package: None,
        hint: "https://github.com/terraform-linters/tflint#installation",
    },
    Dependency {
        tool: "ssh",
        apt_package: Some("openssh-client"),
        hint: "openssh-client",
    },
    Dependency {
        tool: "ssh-keygen",
        apt_package: Some("openssh-client"),
        hint: "openssh-client",
    },
    Dependency {
        tool: "curl",
        apt_package: Some("curl"),
        hint: "curl",
    },
];

pub fn run(_ctx: &CliContext, args: DepsArgs) -> Result<()> {
    log::step("Checking system dependencies...");

    let mut apt_packages: Vec<&str> = Vec::new();
    let mut missing_manual: Vec<&Dependency> = Vec::new();

    for dep in DEPENDENCIES {
        if !process::find_bins_on_path(dep.tool).is_empty() {
            log::info(&format!("✓ {}", dep.tool));
        } else if let Some(pkg) = dep.apt_package {
            if !apt_packages.contains(&pkg) {
                apt_packages.push(pkg);
            }
            log::warn(&format!("✗ {} (installable: {})", dep.tool, pkg));
        } else {
            log::error(&format!("✗ {} - Install: {}", dep.tool, dep.hint));
            missing_manual.push(dep);
        }
    }

    if !apt_packages.is_empty() {
        if args.install {
            log::step(&format!("Installing: {}", apt_packages.join(" ")));
            let mut cmd = Command::new("sudo");
            cmd.arg("apt").arg("install").arg("-y").args(&apt_packages);
            if process::run_interactive(&mut cmd).is_err() {
                bail!(
                    "package installation failed; run manually: sudo apt install -y {}",
                    apt_packages.join(" ")
                );
            }
            log::info("Packages installed");
        } else {
            log::warn(&format!(
                "missing packages; run with --install or: sudo apt install -y {}",
                apt_packages.join(" ")
            ));
        }
    }

    if !missing_manual.is_empty() {
        bail!(
            "{} dependencies require manual installation",
            missing_manual.len()
        );
    }
    if !apt_packages.is_empty() && !args.install {
        bail!("missing dependencies (re-run with --install)");
    }

    log::info("All dependencies satisfied");
    Ok(())
}
