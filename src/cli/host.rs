//! Proxmox host preparation commands.

use crate::cli::CliContext;
use crate::core::{proxmox, tfvars::TfvarsFile};
use crate::util::ssh::{self, SshTarget};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum HostCommand {
    /// Ensure an LXC template exists on a storage (download if missing)
    Template(TemplateArgs),
    /// Install Docker and sshd inside an LXC container
    Setup(SetupArgs),
    /// Copy the local SSH public key into an LXC container
    CopyKey(CopyKeyArgs),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Storage name (e.g. local)
    pub storage: String,

    /// Template name (e.g. alpine-3.19-default_20240101_amd64.tar.xz)
    pub template: String,

    /// Proxmox host (default: pm_host from terraform.tfvars)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// LXC container id (VMID)
    pub vmid: u32,

    /// Skip installing docker-compose
    #[arg(long)]
    pub no_compose: bool,

    /// Proxmox host (default: pm_host from terraform.tfvars)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

#[derive(Args, Debug)]
pub struct CopyKeyArgs {
    /// LXC container id (VMID)
    pub vmid: u32,

    /// Proxmox host (default: pm_host from terraform.tfvars)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

fn resolve_target(ctx: &CliContext, host: Option<String>) -> Result<SshTarget> {
    let host = match host {
        Some(host) => host,
        None => TfvarsFile::new(&ctx.paths.tfvars)
            .read_key("pm_host")?
            .context("Proxmox host unknown; pass --host or set pm_host in terraform.tfvars")?,
    };
    Ok(SshTarget::new(ctx.settings.host.ssh_user.clone(), host))
}

pub fn run(ctx: &CliContext, command: HostCommand) -> Result<()> {
    match command {
        HostCommand::Template(args) => {
            let target = resolve_target(ctx, args.host)?;
            let result = proxmox::ensure_template(&target, &args.storage, &args.template);
            ctx.record("host-template", &result);
            result
        }
        HostCommand::Setup(args) => {
            let target = resolve_target(ctx, args.host)?;
            let result = proxmox::install_docker(&target, args.vmid, !args.no_compose);
            ctx.record("host-setup", &result);
            result
        }
        HostCommand::CopyKey(args) => {
            let target = resolve_target(ctx, args.host)?;
            let (_key_path, public_key) = ssh::ensure_local_key()?;
            let result = proxmox::copy_ssh_key_to_container(&target, args.vmid, &public_key);
            ctx.record("host-copy-key", &result);
            result
        }
    }
}
