//! Infisical REST API client for bootstrap and machine identity issuance.

use crate::constants;
use crate::models::credential::MachineCredentials;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Admin token and organization id obtained from bootstrap or login.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub org_id: String,
}

/// Result of a bootstrap attempt against a possibly pre-initialized
/// instance.
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// Fresh instance: admin account and organization were created.
    Created(AdminSession),
    /// The service reported it is already initialized (HTTP 400).
    AlreadyInitialized,
}

pub struct SecretsClient {
    base_url: String,
    http: Client,
}

#[derive(Serialize)]
struct BootstrapRequest<'a> {
    email: &'a str,
    password: &'a str,
    organization: &'a str,
}

#[derive(Deserialize)]
struct BootstrapResponse {
    identity: BootstrapIdentity,
    organization: OrganizationBody,
}

#[derive(Deserialize)]
struct BootstrapIdentity {
    credentials: BootstrapCredentials,
}

#[derive(Deserialize)]
struct BootstrapCredentials {
    token: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "accessToken")]
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct OrganizationResponse {
    organization: OrganizationBody,
}

#[derive(Deserialize)]
struct OrganizationBody {
    #[serde(default)]
    id: Option<String>,
    // older API versions expose the Mongo-style id
    #[serde(default, rename = "_id")]
    legacy_id: Option<String>,
}

impl OrganizationBody {
    fn any_id(&self) -> Option<String> {
        self.id.clone().or_else(|| self.legacy_id.clone())
    }
}

#[derive(Serialize)]
struct CreateIdentityRequest<'a> {
    name: &'a str,
    #[serde(rename = "organizationId")]
    organization_id: &'a str,
    role: &'a str,
}

#[derive(Deserialize)]
struct CreateIdentityResponse {
    identity: IdentityBody,
}

#[derive(Deserialize)]
struct IdentityBody {
    id: String,
}

#[derive(Deserialize)]
struct UniversalAuthResponse {
    #[serde(rename = "identityUniversalAuth")]
    universal_auth: UniversalAuthBody,
}

#[derive(Deserialize)]
struct UniversalAuthBody {
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Serialize)]
struct ClientSecretRequest<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
struct ClientSecretResponse {
    #[serde(rename = "clientSecret")]
    client_secret: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    secret: SecretBody,
}

#[derive(Deserialize)]
struct SecretBody {
    #[serde(default, rename = "secretValue")]
    secret_value: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl SecretsClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(constants::API_TIMEOUT_SECS))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            base_url: format!("http://{}:{}", host, port),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single readiness probe against `/api/status`.
    pub fn is_ready(&self) -> bool {
        self.http
            .get(format!("{}/api/status", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    /// Create the first admin account and organization.
    ///
    /// An HTTP 400 is the service's explicit "already initialized" answer
    /// and is surfaced as such; every other failure is an error.
    pub fn bootstrap(&self, email: &str, password: &str, org_name: &str) -> Result<BootstrapOutcome> {
        let resp = self
            .http
            .post(format!("{}/api/v1/admin/bootstrap", self.base_url))
            .json(&BootstrapRequest {
                email,
                password,
                organization: org_name,
            })
            .send()
            .context("bootstrap request")?;

        let status = resp.status();
        if status.is_success() {
            let body: BootstrapResponse = resp.json().context("parse bootstrap response")?;
            let org_id = body
                .organization
                .any_id()
                .context("bootstrap response missing organization id")?;
            return Ok(BootstrapOutcome::Created(AdminSession {
                token: body.identity.credentials.token,
                org_id,
            }));
        }
        if status == StatusCode::BAD_REQUEST {
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }
        let body = resp.text().unwrap_or_default();
        bail!("bootstrap failed: {} - {}", status, body);
    }

    /// Recover an admin session on an already-initialized instance by
    /// logging in with the admin credentials.
    pub fn recover_session(&self, email: &str, password: &str) -> Result<AdminSession> {
        let resp = self
            .http
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .json(&LoginRequest { email, password })
            .send()
            .context("login request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("login failed: {}", status);
        }
        let body: LoginResponse = resp.json().context("parse login response")?;
        let token = body
            .token
            .or(body.access_token)
            .context("login response contained no token")?;

        let org_resp = self
            .http
            .get(format!("{}/api/v1/organization", self.base_url))
            .bearer_auth(&token)
            .send()
            .context("organization request")?;
        let status = org_resp.status();
        if !status.is_success() {
            bail!("organization lookup failed: {}", status);
        }
        let org: OrganizationResponse = org_resp.json().context("parse organization response")?;
        let org_id = org
            .organization
            .any_id()
            .context("organization response missing id")?;

        Ok(AdminSession { token, org_id })
    }

    /// Create a machine identity with universal-auth credentials.
    pub fn create_machine_identity(
        &self,
        session: &AdminSession,
        name: &str,
    ) -> Result<MachineCredentials> {
        let resp = self
            .http
            .post(format!("{}/api/v1/identities", self.base_url))
            .bearer_auth(&session.token)
            .json(&CreateIdentityRequest {
                name,
                organization_id: &session.org_id,
                role: "admin",
            })
            .send()
            .context("create identity request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("create identity failed: {} - {}", status, body);
        }
        let identity: CreateIdentityResponse =
            resp.json().context("parse identity response")?;
        let identity_id = identity.identity.id;

        let resp = self
            .http
            .post(format!(
                "{}/api/v1/auth/universal-auth/identities/{}",
                self.base_url, identity_id
            ))
            .bearer_auth(&session.token)
            .json(&serde_json::json!({}))
            .send()
            .context("attach universal auth request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("attach universal auth failed: {} - {}", status, body);
        }
        let auth: UniversalAuthResponse =
            resp.json().context("parse universal auth response")?;

        let resp = self
            .http
            .post(format!(
                "{}/api/v1/auth/universal-auth/identities/{}/client-secrets",
                self.base_url, identity_id
            ))
            .bearer_auth(&session.token)
            .json(&ClientSecretRequest {
                description: "issued by selfhost-deploy",
            })
            .send()
            .context("create client secret request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("create client secret failed: {} - {}", status, body);
        }
        let secret: ClientSecretResponse =
            resp.json().context("parse client secret response")?;

        Ok(MachineCredentials {
            client_id: auth.universal_auth.client_id,
            client_secret: secret.client_secret,
            token: Some(session.token.clone()),
        })
    }

    /// Read a secret value from a project environment.
    pub fn get_secret(
        &self,
        access_token: &str,
        project_id: &str,
        env_slug: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let resp = self
            .http
            .get(format!("{}/api/v3/secrets/{}", self.base_url, name))
            .bearer_auth(access_token)
            .query(&[("workspaceId", project_id), ("environment", env_slug)])
            .send()
            .context("get secret request")?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: SecretResponse = resp.json().context("parse secret response")?;
        Ok(body.secret.secret_value.or(body.secret.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_response_parses() {
        let json = r#"{
            "identity": {"credentials": {"token": "admin-tok"}},
            "organization": {"id": "org-1"}
        }"#;
        let body: BootstrapResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.identity.credentials.token, "admin-tok");
        assert_eq!(body.organization.any_id().as_deref(), Some("org-1"));
    }

    #[test]
    fn test_organization_legacy_id_fallback() {
        let json = r#"{"organization": {"_id": "legacy-org"}}"#;
        let body: OrganizationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.organization.any_id().as_deref(), Some("legacy-org"));
    }

    #[test]
    fn test_login_response_token_variants() {
        let plain: LoginResponse = serde_json::from_str(r#"{"token": "t1"}"#).unwrap();
        assert_eq!(plain.token.or(plain.access_token).as_deref(), Some("t1"));

        let access: LoginResponse =
            serde_json::from_str(r#"{"accessToken": "t2"}"#).unwrap();
        assert_eq!(access.token.or(access.access_token).as_deref(), Some("t2"));
    }

    #[test]
    fn test_identity_chain_responses_parse() {
        let identity: CreateIdentityResponse =
            serde_json::from_str(r#"{"identity": {"id": "id-9"}}"#).unwrap();
        assert_eq!(identity.identity.id, "id-9");

        let auth: UniversalAuthResponse = serde_json::from_str(
            r#"{"identityUniversalAuth": {"clientId": "client-1"}}"#,
        )
        .unwrap();
        assert_eq!(auth.universal_auth.client_id, "client-1");

        let secret: ClientSecretResponse =
            serde_json::from_str(r#"{"clientSecret": "shhh"}"#).unwrap();
        assert_eq!(secret.client_secret, "shhh");
    }

    #[test]
    fn test_secret_value_field_fallback() {
        let modern: SecretResponse =
            serde_json::from_str(r#"{"secret": {"secretValue": "v1"}}"#).unwrap();
        assert_eq!(
            modern.secret.secret_value.or(modern.secret.value).as_deref(),
            Some("v1")
        );

        let legacy: SecretResponse =
            serde_json::from_str(r#"{"secret": {"value": "v2"}}"#).unwrap();
        assert_eq!(
            legacy.secret.secret_value.or(legacy.secret.value).as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_base_url_format() {
        let client = SecretsClient::new("10.0.0.5", 8080).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.5:8080");
    }
}
