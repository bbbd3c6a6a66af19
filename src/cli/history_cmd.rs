//! Run history inspection commands.

use crate::cli::CliContext;
use crate::core::history;
use anyhow::{bail, Result};
use chrono::Local;
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Show recent deployment runs
    Show(ShowArgs),
    /// Verify the integrity of the history chain
    Verify,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Maximum number of entries to show (newest last)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub fn run(ctx: &CliContext, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::Show(args) => {
            let entries = history::read(&ctx.paths, Some(args.limit))?;
            if entries.is_empty() {
                println!("no deployment history yet");
                return Ok(());
            }

            if args.format == "json" {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("When").add_attribute(Attribute::Bold),
                Cell::new("Phase").add_attribute(Attribute::Bold),
                Cell::new("Actor").add_attribute(Attribute::Bold),
                Cell::new("Result").add_attribute(Attribute::Bold),
                Cell::new("Error").add_attribute(Attribute::Bold),
            ]);
            for entry in &entries {
                let when = entry
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string();
                let result = if entry.success { "ok" } else { "FAILED" };
                table.add_row(vec![
                    when,
                    entry.phase.clone(),
                    entry.actor.clone(),
                    result.to_string(),
                    entry.error.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
            Ok(())
        }
        HistoryCommand::Verify => {
            let (total, errors) = history::verify_chain(&ctx.paths)?;
            if errors.is_empty() {
                println!("history chain ok ({} entries)", total);
                return Ok(());
            }
            for error in &errors {
                println!("  {}", error);
            }
            bail!("history chain verification failed ({} problems)", errors.len());
        }
    }
}
