//! Diagnostics for project layout and automation readiness.

use crate::cli::CliContext;
use crate::constants;
use crate::core::credentials::CredentialsFile;
use crate::core::tfvars::TfvarsFile;
use crate::util::process;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also check for multiple selfhost-deploy binaries on PATH
    #[arg(long)]
    pub path: bool,
}

pub fn run(ctx: &CliContext, args: DoctorArgs) -> Result<()> {
    let paths = &ctx.paths;
    let mut ok = 0u32;
    let mut warn = 0u32;
    let mut fail = 0u32;

    println!("Doctor: {}", paths);
    if let Some(w) = &ctx.settings_load_warning {
        println!("  [WARN] {}", w);
        warn += 1;
    }

    // Project layout
    if paths.root.is_dir() {
        println!("  [PASS] project root exists: {}", paths.root.display());
        ok += 1;
    } else {
        println!("  [FAIL] project root missing: {}", paths.root.display());
        fail += 1;
    }

    if paths.root.join("main.tf").is_file() {
        println!("  [PASS] main.tf present");
        ok += 1;
    } else {
        println!("  [WARN] main.tf missing (not a terraform project root?)");
        warn += 1;
    }

    // tfvars and the variables the pipeline needs
    if paths.tfvars.is_file() {
        println!("  [PASS] terraform.tfvars present");
        ok += 1;
        let tfvars = TfvarsFile::new(&paths.tfvars);
        for key in ["docker_host_ip", "infisical_admin_email", "pm_host"] {
            match tfvars.read_key(key) {
                Ok(Some(_)) => {
                    println!("  [PASS] tfvars key set: {}", key);
                    ok += 1;
                }
                Ok(None) => {
                    println!("  [WARN] tfvars key missing: {}", key);
                    warn += 1;
                }
                Err(e) => {
                    println!("  [FAIL] cannot read tfvars: {}", e);
                    fail += 1;
                    break;
                }
            }
        }
        if let Ok(enabled) = tfvars.read_bool(constants::ENABLE_SERVICE_KEY) {
            let state = if enabled { "enabled" } else { "disabled" };
            println!(
                "  [INFO] service module {} ({} = {})",
                state,
                constants::ENABLE_SERVICE_KEY,
                enabled
            );
        }
    } else {
        println!("  [WARN] terraform.tfvars missing: {}", paths.tfvars.display());
        warn += 1;
    }

    // Credential record state
    let credentials = CredentialsFile::new(&paths.credentials);
    if credentials.is_complete() {
        println!("  [PASS] machine credentials present (bootstrap done)");
        ok += 1;
    } else if credentials.exists() {
        println!("  [WARN] credentials file incomplete (bootstrap will re-run)");
        warn += 1;
    } else {
        println!("  [INFO] no credentials yet (bootstrap pending)");
    }

    // Required tools
    for tool in ["terraform", "tflint", "ssh"] {
        if process::find_bins_on_path(tool).is_empty() {
            println!("  [FAIL] {} not found on PATH", tool);
            fail += 1;
        } else {
            println!("  [PASS] {} available", tool);
            ok += 1;
        }
    }

    // Local SSH key
    let has_key = std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| {
            home.join(".ssh/id_ed25519.pub").is_file() || home.join(".ssh/id_rsa.pub").is_file()
        })
        .unwrap_or(false);
    if has_key {
        println!("  [PASS] local SSH public key exists");
        ok += 1;
    } else {
        println!("  [WARN] no local SSH key (apply will generate one)");
        warn += 1;
    }

    if args.path {
        let bins = process::find_bins_on_path("selfhost-deploy");
        if bins.is_empty() {
            println!("  [WARN] selfhost-deploy not found on PATH");
            warn += 1;
        } else {
            println!("  [INFO] selfhost-deploy binaries on PATH:");
            for b in &bins {
                println!("    - {}", b.display());
            }
            if bins.len() > 1 {
                println!("  [WARN] multiple binaries detected; automation should pin one path");
                warn += 1;
            } else {
                ok += 1;
            }
        }
    }

    println!();
    println!("Doctor summary: {} pass, {} warn, {} fail", ok, warn, fail);
    if fail > 0 {
        std::process::exit(1);
    }
    Ok(())
}
