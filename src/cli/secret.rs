//! Secret retrieval for downstream automation.
//!
//! `secret get` prints the bare value to stdout so scripts and Terraform
//! external data sources can consume it; all progress goes to stderr.

use crate::cli::CliContext;
use crate::core::credentials::CredentialsFile;
use crate::core::secrets::SecretsClient;
use crate::core::tfvars::TfvarsFile;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum SecretCommand {
    /// Read a secret value and print it to stdout
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Secret name
    pub name: String,

    /// Project (workspace) id (default: infisical_project_id from
    /// terraform.tfvars)
    #[arg(long, value_name = "ID")]
    pub project: Option<String>,

    /// Environment slug (default: infisical_env from terraform.tfvars,
    /// else "prod")
    #[arg(long, value_name = "SLUG")]
    pub env: Option<String>,
}

/// Resolve the project/environment scope from args and tfvars.
fn resolve_scope(
    tfvars: &TfvarsFile,
    project: Option<String>,
    env: Option<String>,
) -> Result<(String, String)> {
    let project = match project {
        Some(project) => project,
        None => tfvars.read_key("infisical_project_id")?.context(
            "project unknown; pass --project or set infisical_project_id in terraform.tfvars",
        )?,
    };
    let env = match env {
        Some(env) => env,
        None => tfvars
            .read_key("infisical_env")?
            .unwrap_or_else(|| "prod".to_string()),
    };
    Ok((project, env))
}

pub fn run(ctx: &CliContext, command: SecretCommand) -> Result<()> {
    match command {
        SecretCommand::Get(args) => {
            let tfvars = TfvarsFile::new(&ctx.paths.tfvars);
            let (project, env) = resolve_scope(&tfvars, args.project, args.env)?;

            let host = tfvars
                .read_key("docker_host_ip")?
                .context("docker_host_ip not set in terraform.tfvars")?;
            let port = match tfvars.read_key("infisical_port")? {
                Some(raw) => raw
                    .parse::<u16>()
                    .with_context(|| format!("invalid infisical_port '{}'", raw))?,
                None => ctx.settings.service.port,
            };

            let token = CredentialsFile::new(&ctx.paths.credentials)
                .load()?
                .and_then(|creds| creds.token)
                .context("no API token on file; run bootstrap first")?;

            let client = SecretsClient::new(&host, port)?;
            match client.get_secret(&token, &project, &env, &args.name)? {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => bail!("secret '{}' not found in {}/{}", args.name, project, env),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scope_from_tfvars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("terraform.tfvars");
        fs::write(
            &path,
            "infisical_project_id = \"proj-1\"\ninfisical_env = \"staging\"\n",
        )
        .unwrap();
        let tfvars = TfvarsFile::new(&path);
        let (project, env) = resolve_scope(&tfvars, None, None).unwrap();
        assert_eq!(project, "proj-1");
        assert_eq!(env, "staging");
    }

    #[test]
    fn test_scope_args_override_and_env_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("terraform.tfvars");
        fs::write(&path, "infisical_project_id = \"proj-1\"\n").unwrap();
        let tfvars = TfvarsFile::new(&path);
        let (project, env) =
            resolve_scope(&tfvars, Some("proj-2".into()), None).unwrap();
        assert_eq!(project, "proj-2");
        assert_eq!(env, "prod");
    }

    #[test]
    fn test_scope_requires_project() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("terraform.tfvars");
        let tfvars = TfvarsFile::new(&path);
        let err = resolve_scope(&tfvars, None, None).unwrap_err();
        assert!(err.to_string().contains("infisical_project_id"));
    }
}
