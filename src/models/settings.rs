//! Orchestrator settings file model (`deploy.toml`).

use crate::constants;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub host: HostSection,
}

/// Secrets service defaults, overridable per-project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_org_name")]
    pub org_name: String,
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            org_name: default_org_name(),
            network: default_network(),
        }
    }
}

/// Polling budgets for readiness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_api_max_attempts")]
    pub api_max_attempts: u32,
    #[serde(default = "default_api_interval_secs")]
    pub api_interval_secs: u64,
    #[serde(default = "default_ssh_max_attempts")]
    pub ssh_max_attempts: u32,
    #[serde(default = "default_ssh_interval_secs")]
    pub ssh_interval_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            api_max_attempts: default_api_max_attempts(),
            api_interval_secs: default_api_interval_secs(),
            ssh_max_attempts: default_ssh_max_attempts(),
            ssh_interval_secs: default_ssh_interval_secs(),
        }
    }
}

/// SSH access defaults for the Proxmox host and the container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSection {
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            ssh_user: default_ssh_user(),
        }
    }
}

fn default_port() -> u16 {
    constants::DEFAULT_SERVICE_PORT
}

fn default_org_name() -> String {
    constants::DEFAULT_ORG_NAME.to_string()
}

fn default_network() -> String {
    constants::DEFAULT_NETWORK.to_string()
}

fn default_api_max_attempts() -> u32 {
    constants::API_WAIT_MAX_ATTEMPTS
}

fn default_api_interval_secs() -> u64 {
    constants::API_WAIT_INTERVAL_SECS
}

fn default_ssh_max_attempts() -> u32 {
    constants::SSH_WAIT_MAX_ATTEMPTS
}

fn default_ssh_interval_secs() -> u64 {
    constants::SSH_WAIT_INTERVAL_SECS
}

fn default_ssh_user() -> String {
    constants::DEFAULT_SSH_USER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let settings: SettingsFile = toml::from_str("").unwrap();
        assert_eq!(settings.service.port, constants::DEFAULT_SERVICE_PORT);
        assert_eq!(settings.service.org_name, constants::DEFAULT_ORG_NAME);
        assert_eq!(settings.retry.api_max_attempts, constants::API_WAIT_MAX_ATTEMPTS);
        assert_eq!(settings.host.ssh_user, constants::DEFAULT_SSH_USER);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings: SettingsFile = toml::from_str(
            r#"
            [service]
            port = 9090

            [retry]
            ssh_max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.service.port, 9090);
        assert_eq!(settings.service.network, constants::DEFAULT_NETWORK);
        assert_eq!(settings.retry.ssh_max_attempts, 5);
        assert_eq!(
            settings.retry.api_interval_secs,
            constants::API_WAIT_INTERVAL_SECS
        );
    }

    #[test]
    fn test_host_section_override_and_default() {
        let settings: SettingsFile = toml::from_str("[host]\nssh_user = \"deploy\"\n").unwrap();
        assert_eq!(settings.host.ssh_user, "deploy");

        let defaulted: SettingsFile = toml::from_str("[host]\n").unwrap();
        assert_eq!(defaulted.host.ssh_user, constants::DEFAULT_SSH_USER);
    }
}
