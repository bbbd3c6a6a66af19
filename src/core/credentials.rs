//! Machine credential persistence.
//!
//! Credentials are written as tfvars-style key-value lines so later
//! Terraform runs pick them up directly. The file is rewritten wholesale
//! and atomically; presence of a complete record is the marker that
//! bootstrap already happened.

use crate::constants;
use crate::models::credential::MachineCredentials;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const CLIENT_ID_KEY: &str = "infisical_client_id";
const CLIENT_SECRET_KEY: &str = "infisical_client_secret";
const TOKEN_KEY: &str = "infisical_token";

pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether a complete credential record is on disk. This is the
    /// "bootstrap already done" marker: both the client id and secret must
    /// parse to non-empty values.
    pub fn is_complete(&self) -> bool {
        match self.load() {
            Ok(Some(creds)) => creds.is_complete(),
            _ => false,
        }
    }

    /// Load the record, `None` when the file is absent or lacks both keys.
    pub fn load(&self) -> Result<Option<MachineCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let values = parse_pairs(&content);
        let client_id = values.get(CLIENT_ID_KEY).cloned().unwrap_or_default();
        let client_secret = values.get(CLIENT_SECRET_KEY).cloned().unwrap_or_default();
        if client_id.is_empty() && client_secret.is_empty() {
            return Ok(None);
        }
        Ok(Some(MachineCredentials {
            client_id,
            client_secret,
            token: values.get(TOKEN_KEY).cloned().filter(|t| !t.is_empty()),
        }))
    }

    /// Save the record atomically with owner-only permissions.
    pub fn save(&self, creds: &MachineCredentials) -> Result<()> {
        let mut content = String::new();
        content.push_str(&format!("{}     = \"{}\"\n", CLIENT_ID_KEY, creds.client_id));
        content.push_str(&format!(
            "{} = \"{}\"\n",
            CLIENT_SECRET_KEY, creds.client_secret
        ));
        if let Some(token) = &creds.token {
            content.push_str(&format!("{}         = \"{}\"\n", TOKEN_KEY, token));
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("create temp credentials file")?;
        tmp.write_all(content.as_bytes())
            .context("write credentials")?;
        tmp.flush().ok();

        #[cfg(unix)]
        {
            let perm = fs::Permissions::from_mode(constants::CREDENTIALS_FILE_MODE);
            tmp.as_file()
                .set_permissions(perm)
                .context("set permissions on credentials file")?;
        }

        tmp.persist(&self.path)
            .map_err(|err| anyhow::anyhow!("persist credentials file: {}", err))?;
        Ok(())
    }
}

fn parse_pairs(content: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim().trim_matches('"').to_string();
        if !key.is_empty() {
            out.insert(key, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn creds_in(dir: &TempDir) -> CredentialsFile {
        CredentialsFile::new(dir.path().join("infisical_token.auto.tfvars"))
    }

    #[test]
    fn test_fresh_state_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        assert!(!file.exists());
        assert!(!file.is_complete());
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_complete() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        file.save(&MachineCredentials {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            token: Some("admintok".into()),
        })
        .unwrap();

        assert!(file.is_complete());
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.client_id, "cid");
        assert_eq!(loaded.client_secret, "csecret");
        assert_eq!(loaded.token.as_deref(), Some("admintok"));
    }

    #[test]
    fn test_empty_values_are_incomplete() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        fs::write(
            file.path(),
            "infisical_client_id = \"\"\ninfisical_client_secret = \"\"\n",
        )
        .unwrap();
        assert!(file.exists());
        assert!(!file.is_complete());
    }

    #[test]
    fn test_partial_record_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        fs::write(file.path(), "infisical_client_id = \"cid\"\n").unwrap();
        assert!(!file.is_complete());
        // but it still loads, so the operator can inspect what is there
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.client_id, "cid");
        assert!(loaded.client_secret.is_empty());
    }

    #[test]
    fn test_save_omits_absent_token() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        file.save(&MachineCredentials {
            client_id: "cid".into(),
            client_secret: "cs".into(),
            token: None,
        })
        .unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        assert!(!content.contains("infisical_token"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_owner_only() {
        let dir = TempDir::new().unwrap();
        let file = creds_in(&dir);
        file.save(&MachineCredentials {
            client_id: "cid".into(),
            client_secret: "cs".into(),
            token: None,
        })
        .unwrap();
        let mode = fs::metadata(file.path())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, constants::CREDENTIALS_FILE_MODE);
    }
}
