//! Phased deployment pipeline.
//!
//! Every phase is idempotent and independently re-runnable; `apply` chains
//! them with existence checks so a partially deployed stack converges on
//! re-run instead of failing. Provisioning failures are fatal, cleanup
//! failures are warnings.

use crate::constants;
use crate::core::credentials::CredentialsFile;
use crate::core::paths::ProjectPaths;
use crate::core::secrets::{AdminSession, BootstrapOutcome, SecretsClient};
use crate::core::tfvars::TfvarsFile;
use crate::core::{docker, proxmox};
use crate::models::settings::SettingsFile;
use crate::util::terraform::{ApplyOptions, Terraform};
use crate::util::{log, process, retry, ssh};
use anyhow::{bail, Context, Result};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::time::Duration;
use zeroize::Zeroizing;

/// Generate a random alphanumeric password from the OS entropy source.
fn generate_password(length: usize) -> Zeroizing<String> {
    Zeroizing::new(
        OsRng
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect(),
    )
}

pub struct Pipeline<'a> {
    paths: &'a ProjectPaths,
    settings: &'a SettingsFile,
    non_interactive: bool,
    tfvars: TfvarsFile,
    credentials: CredentialsFile,
    terraform: Terraform,
}

impl<'a> Pipeline<'a> {
    pub fn new(paths: &'a ProjectPaths, settings: &'a SettingsFile, non_interactive: bool) -> Self {
        Self {
            paths,
            settings,
            non_interactive,
            tfvars: TfvarsFile::new(&paths.tfvars),
            credentials: CredentialsFile::new(&paths.credentials),
            terraform: Terraform::new(&paths.root),
        }
    }

    pub fn tfvars(&self) -> &TfvarsFile {
        &self.tfvars
    }

    fn ssh_target(&self, host: &str) -> ssh::SshTarget {
        ssh::SshTarget::new(self.settings.host.ssh_user.clone(), host)
    }

    fn check_tools(&self) -> Result<()> {
        log::step("Checking required tools...");
        let missing: Vec<&str> = ["terraform", "tflint"]
            .into_iter()
            .filter(|tool| !process::tool_available(tool))
            .collect();
        if !missing.is_empty() {
            bail!("missing required tools: {}", missing.join(", "));
        }
        log::info("All required tools available");
        Ok(())
    }

    /// Phase 1: provision the LXC container with Docker.
    pub fn phase_container(&self) -> Result<()> {
        log::step("Phase 1: Deploying Docker LXC...");

        self.tfvars
            .write_key(constants::ENABLE_SERVICE_KEY, "false")?;
        self.terraform.apply(&ApplyOptions {
            target: Some(constants::CONTAINER_MODULE_TARGET.to_string()),
            ..Default::default()
        })?;

        log::info("Phase 1 complete");
        log::info("Get container IP: terraform output docker_container_ip");
        Ok(())
    }

    /// Phase 2: deploy the secrets service containers on the host.
    pub fn phase_service(&self, host_ip: &str) -> Result<()> {
        log::step("Phase 2: Deploying secrets service containers...");

        let host = self.ssh_target(host_ip);
        let network = &self.settings.service.network;

        // Orphaned resources from a failed run block the provider.
        docker::cleanup_resources(&host, network);

        self.tfvars
            .write_key(constants::ENABLE_SERVICE_KEY, "true")?;

        let targeted = ApplyOptions {
            target: Some(constants::SERVICE_MODULE_TARGET.to_string()),
            skip_refresh: true,
        };
        if self.terraform.apply(&targeted).is_err() {
            log::warn("Apply failed, retrying after cleanup...");
            docker::cleanup_resources(&host, network);
            self.terraform.apply(&ApplyOptions {
                target: Some(constants::SERVICE_MODULE_TARGET.to_string()),
                ..Default::default()
            })?;
        }

        log::info("Phase 2 complete");
        Ok(())
    }

    /// Phase 3: bootstrap the secrets service and persist machine
    /// credentials. Skipped entirely when a complete record exists.
    pub fn bootstrap(&self, generate_password: bool) -> Result<()> {
        log::step("Phase 3: Bootstrapping secrets service...");

        if self.credentials.is_complete() {
            log::info("Credentials already exist, skipping bootstrap");
            return Ok(());
        }

        let host = self
            .tfvars
            .read_key("docker_host_ip")?
            .context("missing required variable: docker_host_ip")?;
        let email = self
            .tfvars
            .read_key("infisical_admin_email")?
            .context("missing required variable: infisical_admin_email")?;
        let port = match self.tfvars.read_key("infisical_port")? {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid infisical_port '{}'", raw))?,
            None => self.settings.service.port,
        };
        let org_name = self
            .tfvars
            .read_key("infisical_org_name")?
            .unwrap_or_else(|| self.settings.service.org_name.clone());

        let client = SecretsClient::new(&host, port)?;
        log::info(&format!("Waiting for API at {}...", client.base_url()));
        let ready = retry::wait_until(
            self.settings.retry.api_max_attempts,
            Duration::from_secs(self.settings.retry.api_interval_secs),
            || client.is_ready(),
        );
        if !ready {
            bail!("secrets service API not ready at {}", client.base_url());
        }
        log::info("API is ready");

        let password = self.admin_password(generate_password)?;

        let session = match client.bootstrap(&email, &password, &org_name)? {
            BootstrapOutcome::Created(session) => {
                log::info("Bootstrap successful");
                session
            }
            BootstrapOutcome::AlreadyInitialized => {
                log::info("Instance already initialized, recovering credentials via login...");
                client.recover_session(&email, &password).context(
                    "instance is already initialized and admin login failed; \
                     manual intervention required",
                )?
            }
        };

        let creds = self.create_identity(&client, &session)?;
        log::info(&format!(
            "Saving credentials to {}...",
            self.paths.credentials.display()
        ));
        self.credentials.save(&creds)?;
        log::info("Bootstrap completed");
        Ok(())
    }

    fn create_identity(
        &self,
        client: &SecretsClient,
        session: &AdminSession,
    ) -> Result<crate::models::credential::MachineCredentials> {
        log::info(&format!(
            "Creating machine identity '{}'...",
            constants::MACHINE_IDENTITY_NAME
        ));
        client
            .create_machine_identity(session, constants::MACHINE_IDENTITY_NAME)
            .context("create machine identity")
    }

    /// Resolve the admin password: tfvars first, then terraform state,
    /// then generation (opt-in) or an interactive prompt.
    fn admin_password(&self, generate: bool) -> Result<Zeroizing<String>> {
        if let Some(password) = self.tfvars.read_key("infisical_admin_password")? {
            return Ok(Zeroizing::new(password));
        }
        if let Some(password) = self.terraform.output("infisical_admin_password") {
            return Ok(Zeroizing::new(password));
        }
        if generate {
            // Persist it so later runs can recover via the login path.
            let password = generate_password(24);
            self.tfvars
                .write_key("infisical_admin_password", &password)?;
            log::info("Generated admin password (stored in terraform.tfvars)");
            return Ok(password);
        }
        if self.non_interactive {
            bail!(
                "admin password not found in {} or terraform outputs \
                 (required in non-interactive mode)",
                constants::TFVARS_FILE
            );
        }
        let password = dialoguer::Password::new()
            .with_prompt("Admin password for the secrets service")
            .interact()
            .context("read admin password")?;
        Ok(Zeroizing::new(password))
    }

    /// Phase 4: full apply with the secrets provider enabled.
    pub fn phase_resources(&self) -> Result<()> {
        log::step("Phase 4: Applying secrets provider resources...");

        if !self.credentials.is_complete() {
            log::warn("No credentials available, skipping Phase 4");
            return Ok(());
        }

        // Re-init to pick up provider changes enabled by the credentials.
        self.terraform.init(true)?;
        self.terraform.apply(&ApplyOptions::default())?;

        log::info("Phase 4 complete");
        Ok(())
    }

    /// Full deployment choreography.
    pub fn apply(&self) -> Result<()> {
        log::step("Selfhost deploy: full apply");

        self.check_tools()?;
        let (_key_path, public_key) = ssh::ensure_local_key()?;
        self.terraform.lint()?;
        self.terraform.init(false)?;

        let Some(host_ip) = self.tfvars.read_key("docker_host_ip")? else {
            log::warn("docker_host_ip not set");
            self.phase_container()?;
            log::warn("Add docker_host_ip to terraform.tfvars and run again");
            return Ok(());
        };
        log::info(&format!("Docker host: {}", host_ip));

        let target = self.ssh_target(&host_ip);
        log::step(&format!("Checking SSH connectivity to {}...", host_ip));
        if !target.is_reachable() {
            log::warn("SSH not available");
            self.phase_container()?;
            self.provision_ssh_access(&public_key);

            log::info("Waiting for SSH to become available...");
            let reachable = retry::wait_until(
                self.settings.retry.ssh_max_attempts,
                Duration::from_secs(self.settings.retry.ssh_interval_secs),
                || target.is_reachable(),
            );
            if !reachable {
                log::warn("SSH still not available. Run again when ready.");
                return Ok(());
            }
        }
        log::info("SSH is available");

        if !target.docker_ready() {
            bail!(
                "Docker not responding via SSH; try: ssh {}@{} 'service docker start'",
                self.settings.host.ssh_user,
                host_ip
            );
        }
        log::info("Docker is available");

        self.phase_service(&host_ip)?;

        log::info("Syncing all resources...");
        if self.terraform.apply(&ApplyOptions::default()).is_err() {
            log::warn("full sync apply reported errors, continuing");
        }

        if !self.credentials.is_complete() {
            if let Err(e) = self.bootstrap(false) {
                log::warn(&format!("Bootstrap not completed: {}", e));
                log::warn("Run 'selfhost-deploy bootstrap' when ready.");
                return Ok(());
            }
        }

        self.phase_resources()?;

        log::info("Deployment complete");
        self.terraform.show_outputs();
        Ok(())
    }

    /// Copy the workstation key into the fresh container via the Proxmox
    /// host. Best-effort: the operator may have other access paths.
    fn provision_ssh_access(&self, public_key: &str) {
        let pm_host = match self.tfvars.read_key("pm_host") {
            Ok(Some(host)) => host,
            _ => {
                log::warn("pm_host not set, cannot copy SSH key via Proxmox");
                return;
            }
        };
        let Some(raw_id) = self.terraform.output("docker_container_id") else {
            log::warn("container id unknown, cannot copy SSH key via Proxmox");
            return;
        };
        let vmid = match proxmox::parse_container_id(&raw_id) {
            Ok(vmid) => vmid,
            Err(e) => {
                log::warn(&format!("cannot copy SSH key: {}", e));
                return;
            }
        };
        let proxmox_target = self.ssh_target(&pm_host);
        if let Err(e) = proxmox::copy_ssh_key_to_container(&proxmox_target, vmid, public_key) {
            log::warn(&format!("could not copy SSH key: {}", e));
        }
    }

    /// Tear down the stack: best-effort Docker cleanup first, then
    /// terraform destroy.
    pub fn destroy(&self) -> Result<()> {
        log::step("Destroying infrastructure...");

        if let Some(host_ip) = self.tfvars.read_key("docker_host_ip")? {
            let target = self.ssh_target(&host_ip);
            if target.is_reachable() {
                docker::cleanup_resources(&target, &self.settings.service.network);
            } else {
                log::warn("container host unreachable, skipping Docker cleanup");
            }
        }

        self.terraform.destroy()
    }
}
