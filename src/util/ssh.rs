//! Remote shell transport and local SSH key management.

use crate::constants;
use crate::util::process;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Anything that can run a remote command and hand back its output.
/// Lets command logic be driven by a scripted host in tests.
pub trait RemoteExec {
    fn exec(&self, remote_command: &str) -> Result<Output>;
}

/// A user@host pair all remote operations are addressed to.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
}

impl RemoteExec for SshTarget {
    fn exec(&self, remote_command: &str) -> Result<Output> {
        SshTarget::exec(self, remote_command)
    }
}

impl SshTarget {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Base ssh invocation with our connection options applied.
    fn command(&self, batch: bool) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                constants::SSH_CONNECT_TIMEOUT_SECS
            ))
            .arg("-o")
            .arg("StrictHostKeyChecking=no");
        if batch {
            cmd.arg("-o").arg("BatchMode=yes");
        }
        cmd.arg(self.destination());
        cmd
    }

    /// Run a remote command, capturing output regardless of exit status.
    pub fn exec(&self, remote_command: &str) -> Result<Output> {
        let mut cmd = self.command(false);
        cmd.arg(remote_command);
        process::run(&mut cmd)
            .with_context(|| format!("ssh {}", self.destination()))
    }

    /// Probe SSH connectivity (non-interactive, no side effects).
    pub fn is_reachable(&self) -> bool {
        let mut cmd = self.command(true);
        cmd.arg("exit");
        cmd.output().map(|o| o.status.success()).unwrap_or(false)
    }

    /// Probe whether the Docker daemon answers on the target.
    pub fn docker_ready(&self) -> bool {
        self.exec("docker version")
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Ensure a local SSH keypair exists; returns (private key path, public key).
///
/// Reuses an existing ed25519 or RSA key, generating a fresh ed25519 key
/// only when neither is present.
pub fn ensure_local_key() -> Result<(PathBuf, String)> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .context("HOME not set")?;
    let ssh_dir = home.join(".ssh");
    std::fs::create_dir_all(&ssh_dir)
        .with_context(|| format!("create {}", ssh_dir.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&ssh_dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("set permissions on {}", ssh_dir.display()))?;
    }

    for key_type in ["id_ed25519", "id_rsa"] {
        let key_path = ssh_dir.join(key_type);
        let pub_path = ssh_dir.join(format!("{}.pub", key_type));
        if key_path.exists() && pub_path.exists() {
            let public = std::fs::read_to_string(&pub_path)
                .with_context(|| format!("read {}", pub_path.display()))?;
            return Ok((key_path, public.trim().to_string()));
        }
    }

    let key_path = ssh_dir.join("id_ed25519");
    crate::util::log::info("Generating new SSH key...");
    let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    process::run_checked(
        Command::new("ssh-keygen")
            .arg("-t")
            .arg("ed25519")
            .arg("-f")
            .arg(&key_path)
            .arg("-N")
            .arg("")
            .arg("-C")
            .arg(format!("{}@selfhost", user)),
    )
    .context("generate SSH key")?;

    let pub_path = ssh_dir.join("id_ed25519.pub");
    let public = std::fs::read_to_string(&pub_path)
        .with_context(|| format!("read {}", pub_path.display()))?;
    Ok((key_path, public.trim().to_string()))
}

/// Extract the base64 key material from an OpenSSH public key line.
///
/// `ssh-ed25519 AAAA... comment` → `AAAA...`. Falls back to the whole
/// string when it does not look like a key line.
pub fn key_material(public_key: &str) -> &str {
    public_key.split_whitespace().nth(1).unwrap_or(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_format() {
        let target = SshTarget::new("root", "10.0.0.5");
        assert_eq!(target.destination(), "root@10.0.0.5");
    }

    #[test]
    fn test_key_material_extracts_body() {
        let key = "ssh-ed25519 AAAAC3NzaC1lZDI1 user@host";
        assert_eq!(key_material(key), "AAAAC3NzaC1lZDI1");
    }

    #[test]
    fn test_key_material_falls_back_to_input() {
        assert_eq!(key_material("AAAAC3NzaC1lZDI1"), "AAAAC3NzaC1lZDI1");
    }
}
