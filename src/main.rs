use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = selfhost_deploy::cli::Cli::parse();
    cli.run()
}
