use crate::cli::CliContext;
use crate::util::log;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct ApplyArgs {}

pub fn run(ctx: &CliContext, _args: ApplyArgs) -> Result<()> {
    if let Some(w) = &ctx.settings_load_warning {
        log::warn(w);
    }
    let pipeline = ctx.pipeline();
    let result = pipeline.apply();
    ctx.record("apply", &result);
    result
}
