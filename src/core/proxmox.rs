//! Proxmox host operations: LXC templates, in-container setup, key copy.
//!
//! Everything here runs on the Proxmox host over SSH; container commands
//! are wrapped in `pct exec`.

use crate::util::log;
use crate::util::ssh::{self, SshTarget};
use anyhow::{bail, Result};

/// Ensure an LXC template is present on a storage, downloading when absent.
pub fn ensure_template(host: &SshTarget, storage: &str, template: &str) -> Result<()> {
    log::info(&format!(
        "Checking template '{}' on storage '{}'...",
        template, storage
    ));

    let listing = host.exec(&format!("pveam list {}", storage))?;
    if listing.status.success() {
        let stdout = String::from_utf8_lossy(&listing.stdout);
        if stdout.lines().any(|line| line.contains(template)) {
            log::info(&format!("Template '{}' already exists", template));
            return Ok(());
        }
    }

    log::info(&format!("Downloading template '{}'...", template));
    let download = host.exec(&format!("pveam download {} {}", storage, template))?;
    if !download.status.success() {
        let stderr = String::from_utf8_lossy(&download.stderr);
        bail!("download template '{}': {}", template, stderr);
    }
    log::info(&format!("Template '{}' downloaded", template));
    Ok(())
}

/// Run a shell command inside an LXC container via `pct exec`.
fn container_exec(host: &SshTarget, vmid: u32, script: &str) -> Result<std::process::Output> {
    host.exec(&format!("pct exec {} -- sh -c '{}'", vmid, script))
}

/// Install Docker, Compose and sshd inside an Alpine LXC and enable them
/// at boot.
pub fn install_docker(host: &SshTarget, vmid: u32, with_compose: bool) -> Result<()> {
    log::info(&format!("Installing Docker on container {}...", vmid));

    let mut packages = vec!["docker", "docker-cli", "openssh"];
    if with_compose {
        packages.push("docker-compose");
    }

    let script = format!(
        "apk update && \
         apk add --no-cache {} && \
         rc-update add docker boot && \
         rc-update add sshd boot && \
         ssh-keygen -A && \
         service docker start && \
         service sshd start",
        packages.join(" ")
    );

    let output = container_exec(host, vmid, &script)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("install docker in container {}: {}", vmid, stderr);
    }
    log::info("Docker installed");

    // Prepare the container for key-based SSH from the workstation.
    let setup = container_exec(host, vmid, "mkdir -p /root/.ssh && chmod 700 /root/.ssh")?;
    if !setup.status.success() {
        log::warn("could not prepare /root/.ssh in container");
    }

    Ok(())
}

/// Append an SSH public key to the container's authorized_keys, skipping
/// when the key material is already present.
pub fn copy_ssh_key_to_container(host: &SshTarget, vmid: u32, public_key: &str) -> Result<()> {
    log::step(&format!("Copying SSH key to container {}...", vmid));

    let existing = container_exec(host, vmid, "cat /root/.ssh/authorized_keys 2>/dev/null")?;
    if existing.status.success() {
        let current = String::from_utf8_lossy(&existing.stdout);
        if current.contains(ssh::key_material(public_key)) {
            log::info("SSH key already present in container");
            return Ok(());
        }
    }

    let script = format!(
        "mkdir -p /root/.ssh && \
         chmod 700 /root/.ssh && \
         echo \"{}\" >> /root/.ssh/authorized_keys && \
         chmod 600 /root/.ssh/authorized_keys",
        public_key
    );
    let output = container_exec(host, vmid, &script)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("copy SSH key to container {}: {}", vmid, stderr);
    }
    log::info("SSH key copied to container");
    Ok(())
}

/// Parse the container vmid out of Terraform's resource id output
/// (`proxmox/lxc/<vmid>` or a bare number).
pub fn parse_container_id(raw: &str) -> Result<u32> {
    let trimmed = raw
        .trim()
        .strip_prefix(crate::constants::CONTAINER_ID_PREFIX)
        .unwrap_or_else(|| raw.trim());
    match trimmed.parse::<u32>() {
        Ok(vmid) => Ok(vmid),
        Err(_) => bail!("invalid container id '{}'", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_id_with_prefix() {
        assert_eq!(parse_container_id("proxmox/lxc/105").unwrap(), 105);
    }

    #[test]
    fn test_parse_container_id_bare() {
        assert_eq!(parse_container_id(" 200 ").unwrap(), 200);
    }

    #[test]
    fn test_parse_container_id_rejects_garbage() {
        assert!(parse_container_id("proxmox/lxc/").is_err());
        assert!(parse_container_id("not-a-vmid").is_err());
    }
}
