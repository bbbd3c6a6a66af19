use crate::cli::CliContext;
use crate::util::log;
use anyhow::{bail, Result};
use clap::Args;
use dialoguer::Confirm;

#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

pub fn run(ctx: &CliContext, args: DestroyArgs) -> Result<()> {
    if !args.yes {
        if ctx.non_interactive {
            bail!("destroy requires --yes in non-interactive mode");
        }
        let confirmed = Confirm::new()
            .with_prompt("Destroy all infrastructure (containers, volumes, state)?")
            .default(false)
            .interact()?;
        if !confirmed {
            log::info("Aborted");
            return Ok(());
        }
    }

    let pipeline = ctx.pipeline();
    let result = pipeline.destroy();
    ctx.record("destroy", &result);
    result
}
