use crate::cli::CliContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum PhaseCommand {
    /// Phase 1: provision the Docker LXC container
    Container,
    /// Phase 2: deploy the secrets service containers
    Service(ServiceArgs),
    /// Phase 4: apply secrets provider resources
    Resources,
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Container host IP (default: docker_host_ip from terraform.tfvars)
    #[arg(long, value_name = "IP")]
    pub host: Option<String>,
}

pub fn run(ctx: &CliContext, command: PhaseCommand) -> Result<()> {
    let pipeline = ctx.pipeline();
    match command {
        PhaseCommand::Container => {
            let result = pipeline.phase_container();
            ctx.record("container", &result);
            result
        }
        PhaseCommand::Service(args) => {
            let host = match args.host {
                Some(host) => host,
                None => pipeline
                    .tfvars()
                    .read_key("docker_host_ip")?
                    .context("docker_host_ip not set; pass --host or add it to terraform.tfvars")?,
            };
            let result = pipeline.phase_service(&host);
            ctx.record("service", &result);
            result
        }
        PhaseCommand::Resources => {
            let result = pipeline.phase_resources();
            ctx.record("resources", &result);
            result
        }
    }
}
