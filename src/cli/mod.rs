//! CLI routing and command dispatch.

use crate::core::file_lock::FileLock;
use crate::core::history;
use crate::core::paths::ProjectPaths;
use crate::core::pipeline::Pipeline;
use crate::models::settings::SettingsFile;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod apply;
pub mod bootstrap;
pub mod deps;
pub mod destroy;
pub mod doctor;
pub mod history_cmd;
pub mod host;
pub mod phase;
pub mod secret;
pub mod token;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: ProjectPaths,
    pub non_interactive: bool,
    pub settings: SettingsFile,
    pub settings_load_warning: Option<String>,
}

impl CliContext {
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.paths, &self.settings, self.non_interactive)
    }

    /// Record a phase outcome in the run history.
    pub fn record(&self, phase: &str, result: &Result<()>) {
        let error = result.as_ref().err().map(|e| format!("{:#}", e));
        self.record_raw(phase, result.is_ok(), error);
    }

    pub fn record_ok(&self, phase: &str) {
        self.record_raw(phase, true, None);
    }

    pub fn record_err(&self, phase: &str, error: &anyhow::Error) {
        self.record_raw(phase, false, Some(format!("{:#}", error)));
    }

    fn record_raw(&self, phase: &str, success: bool, error: Option<String>) {
        if let Err(e) = history::record(&self.paths, phase, success, error) {
            eprintln!("warning: history log failed: {}", e);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "selfhost-deploy",
    version,
    about = "Deployment orchestrator for the self-hosted secrets stack"
)]
pub struct Cli {
    /// Project root (default: auto-detected from terraform files)
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "SELFHOST_DEPLOY_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let paths = ProjectPaths::resolve(self.root)?;

        // Load settings from deploy.toml if it exists (best-effort).
        let mut settings_load_warning: Option<String> = None;
        let settings = if paths.settings.exists() {
            match load_settings(&paths.settings) {
                Ok(settings) => settings,
                Err(e) => {
                    settings_load_warning =
                        Some(format!("cannot read settings from deploy.toml: {}", e));
                    SettingsFile::default()
                }
            }
        } else {
            SettingsFile::default()
        };

        let ctx = CliContext {
            paths,
            non_interactive: self.non_interactive,
            settings,
            settings_load_warning,
        };

        // One mutating run at a time per project.
        let _lock = if self.command.mutates() {
            match FileLock::try_exclusive(&ctx.paths.lock)? {
                Some(lock) => Some(lock),
                None => bail!(
                    "another deployment is running (lock held on {})",
                    ctx.paths.lock.display()
                ),
            }
        } else {
            None
        };

        match self.command {
            Commands::Apply(args) => apply::run(&ctx, args),
            Commands::Bootstrap(args) => bootstrap::run(&ctx, args),
            Commands::Destroy(args) => destroy::run(&ctx, args),
            Commands::Phase { command } => phase::run(&ctx, command),
            Commands::Deps(args) => deps::run(&ctx, args),
            Commands::Token { command } => token::run(&ctx, command),
            Commands::Secret { command } => secret::run(&ctx, command),
            Commands::Host { command } => host::run(&ctx, command),
            Commands::Doctor(args) => doctor::run(&ctx, args),
            Commands::History { command } => history_cmd::run(&ctx, command),
        }
    }
}

fn load_settings(path: &std::path::Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full deployment: container, service, bootstrap, resources
    Apply(apply::ApplyArgs),
    /// Bootstrap the secrets service and issue machine credentials
    Bootstrap(bootstrap::BootstrapArgs),
    /// Destroy the stack (docker cleanup first, then terraform destroy)
    Destroy(destroy::DestroyArgs),
    /// Run a single deployment phase
    Phase {
        #[command(subcommand)]
        command: phase::PhaseCommand,
    },
    /// Check (and optionally install) system dependencies
    Deps(deps::DepsArgs),
    /// Manage Proxmox API tokens
    Token {
        #[command(subcommand)]
        command: token::TokenCommand,
    },
    /// Read secrets from the deployed service (safe, read-only)
    Secret {
        #[command(subcommand)]
        command: secret::SecretCommand,
    },
    /// Prepare the Proxmox host and container (templates, docker, keys)
    Host {
        #[command(subcommand)]
        command: host::HostCommand,
    },
    /// Diagnose project and tooling state (safe, read-only)
    Doctor(doctor::DoctorArgs),
    /// View or verify the deployment run history
    History {
        #[command(subcommand)]
        command: history_cmd::HistoryCommand,
    },
}

impl Commands {
    /// Whether this command mutates infrastructure or project state and
    /// therefore takes the run lock.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Apply(_)
                | Commands::Bootstrap(_)
                | Commands::Destroy(_)
                | Commands::Phase { .. }
                | Commands::Token {
                    command: token::TokenCommand::Create(_) | token::TokenCommand::Rotate(_)
                }
                | Commands::Host { .. }
        )
    }
}
