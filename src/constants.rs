//! Centralized constants for file names, defaults, and limits.

/// Terraform variables file read and written by the orchestrator.
pub const TFVARS_FILE: &str = "terraform.tfvars";

/// Credentials file consumed by later Terraform runs.
pub const CREDENTIALS_FILE: &str = "infisical_token.auto.tfvars";

/// Orchestrator settings file.
pub const SETTINGS_FILE: &str = "deploy.toml";

/// Lock file guarding concurrent deployment runs.
pub const LOCK_FILE: &str = "deploy.lock";

/// Append-only run history log.
pub const HISTORY_FILE: &str = "deploy-history.log";

/// Permission mode for the credentials file.
pub const CREDENTIALS_FILE_MODE: u32 = 0o600;

/// Permission mode for the history log.
pub const HISTORY_LOG_MODE: u32 = 0o640;

/// Default port the secrets service listens on.
pub const DEFAULT_SERVICE_PORT: u16 = 8080;

/// Default organization created at bootstrap.
pub const DEFAULT_ORG_NAME: &str = "Selfhost";

/// Default Docker network (and volume prefix) of the service stack.
pub const DEFAULT_NETWORK: &str = "infisical";

/// Default SSH user for the Proxmox host and the container.
pub const DEFAULT_SSH_USER: &str = "root";

/// Default machine identity name created at bootstrap.
pub const MACHINE_IDENTITY_NAME: &str = "terraform-controller";

/// Terraform module target for the container phase.
pub const CONTAINER_MODULE_TARGET: &str = "module.docker_lxc";

/// Terraform module target for the service phase.
pub const SERVICE_MODULE_TARGET: &str = "module.infisical";

/// tfvars key toggling the service module on and off between phases.
pub const ENABLE_SERVICE_KEY: &str = "enable_infisical";

/// Maximum probes while waiting for the secrets service API.
pub const API_WAIT_MAX_ATTEMPTS: u32 = 60;

/// Seconds between API readiness probes.
pub const API_WAIT_INTERVAL_SECS: u64 = 2;

/// Maximum probes while waiting for SSH on a fresh container.
pub const SSH_WAIT_MAX_ATTEMPTS: u32 = 30;

/// Seconds between SSH readiness probes.
pub const SSH_WAIT_INTERVAL_SECS: u64 = 2;

/// SSH connect timeout for probes and remote commands, in seconds.
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP timeout for secrets-service API calls, in seconds.
pub const API_TIMEOUT_SECS: u64 = 30;

/// Prefix Terraform prepends to the container resource id output.
pub const CONTAINER_ID_PREFIX: &str = "proxmox/lxc/";
