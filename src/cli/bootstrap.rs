use crate::cli::CliContext;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Generate an admin password when none is configured (stored in
    /// terraform.tfvars)
    #[arg(long)]
    pub generate_password: bool,
}

pub fn run(ctx: &CliContext, args: BootstrapArgs) -> Result<()> {
    let pipeline = ctx.pipeline();
    let result = pipeline.bootstrap(args.generate_password);
    ctx.record("bootstrap", &result);
    result
}
