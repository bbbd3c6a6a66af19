//! Proxmox API token management commands.
//!
//! `token create --format json` prints a single JSON object on stdout so
//! Terraform external data sources can consume it directly.

use crate::cli::CliContext;
use crate::core::token as token_ops;
use crate::models::token::ApiToken;
use crate::util::ssh::SshTarget;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Create a new API token (fails if it already exists)
    Create(TokenArgs),
    /// Rotate an API token (delete the old one, then create a new one)
    Rotate(TokenArgs),
    /// List API tokens of a Proxmox user
    List(TokenListArgs),
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Proxmox user owning the token (e.g. root@pam)
    pub pve_user: String,

    /// Token name
    pub name: String,

    /// Proxmox host (default: pm_host from terraform.tfvars)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// SSH user on the Proxmox host (default: from deploy.toml)
    #[arg(long, value_name = "USER")]
    pub ssh_user: Option<String>,

    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct TokenListArgs {
    /// Proxmox user whose tokens to list (e.g. root@pam)
    pub pve_user: String,

    /// Proxmox host (default: pm_host from terraform.tfvars)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// SSH user on the Proxmox host (default: from deploy.toml)
    #[arg(long, value_name = "USER")]
    pub ssh_user: Option<String>,
}

fn resolve_target(
    ctx: &CliContext,
    host: Option<String>,
    ssh_user: Option<String>,
) -> Result<SshTarget> {
    let host = match host {
        Some(host) => host,
        None => crate::core::tfvars::TfvarsFile::new(&ctx.paths.tfvars)
            .read_key("pm_host")?
            .context("Proxmox host unknown; pass --host or set pm_host in terraform.tfvars")?,
    };
    let user = ssh_user.unwrap_or_else(|| ctx.settings.host.ssh_user.clone());
    Ok(SshTarget::new(user, host))
}

/// Render the created token for stdout. In JSON mode this is the only
/// thing printed to stdout, as a single object on one line.
fn render_token(token: &ApiToken, format: &str) -> Result<String> {
    if format == "json" {
        return serde_json::to_string(token).context("serialize token");
    }
    Ok(format!(
        "token id:     {}\ntoken secret: {}\n(the secret is shown only once; store it now)",
        token.token_id, token.token_secret
    ))
}

fn print_token(token: &ApiToken, format: &str) -> Result<()> {
    println!("{}", render_token(token, format)?);
    Ok(())
}

pub fn run(ctx: &CliContext, command: TokenCommand) -> Result<()> {
    match command {
        TokenCommand::Create(args) => {
            let target = resolve_target(ctx, args.host, args.ssh_user)?;
            match token_ops::create_token(&target, &args.pve_user, &args.name) {
                Ok(token) => {
                    ctx.record_ok("token-create");
                    print_token(&token, &args.format)
                }
                Err(e) => {
                    ctx.record_err("token-create", &e);
                    Err(e)
                }
            }
        }
        TokenCommand::Rotate(args) => {
            let target = resolve_target(ctx, args.host, args.ssh_user)?;
            match token_ops::rotate_token(&target, &args.pve_user, &args.name) {
                Ok(token) => {
                    ctx.record_ok("token-rotate");
                    print_token(&token, &args.format)
                }
                Err(e) => {
                    ctx.record_err("token-rotate", &e);
                    Err(e)
                }
            }
        }
        TokenCommand::List(args) => {
            let target = resolve_target(ctx, args.host, args.ssh_user)?;
            let entries = token_ops::list_tokens(&target, &args.pve_user);
            if entries.is_empty() {
                println!("no tokens for {}", args.pve_user);
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Token").add_attribute(Attribute::Bold),
                Cell::new("Comment").add_attribute(Attribute::Bold),
                Cell::new("Expires").add_attribute(Attribute::Bold),
            ]);
            for entry in &entries {
                let expires = match entry.expire {
                    Some(0) | None => "never".to_string(),
                    Some(ts) => ts.to_string(),
                };
                table.add_row(vec![
                    entry.token_id.clone(),
                    entry.comment.clone().unwrap_or_default(),
                    expires,
                ]);
            }
            println!("{table}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_token_json_is_single_object() {
        let token = ApiToken {
            token_id: "root@pam!terraform".into(),
            token_secret: "s3cret".into(),
        };
        let rendered = render_token(&token, "json").unwrap();
        assert_eq!(rendered.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["token_id"], "root@pam!terraform");
        assert_eq!(value["token_secret"], "s3cret");
    }

    #[test]
    fn test_render_token_text_shows_both_halves() {
        let token = ApiToken {
            token_id: "root@pam!ci".into(),
            token_secret: "abc".into(),
        };
        let rendered = render_token(&token, "text").unwrap();
        assert!(rendered.contains("root@pam!ci"));
        assert!(rendered.contains("abc"));
    }
}
