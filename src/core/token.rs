//! Proxmox API token lifecycle via `pveum` over SSH.

use crate::models::token::{split_token_id, ApiToken, TokenCreateOutput, TokenEntry};
use crate::util::log;
use crate::util::ssh::RemoteExec;
use anyhow::{bail, Context, Result};

/// List all API tokens of a Proxmox user. Failures degrade to an empty
/// list with a warning so read paths stay usable on older hosts.
pub fn list_tokens(host: &impl RemoteExec, pve_user: &str) -> Vec<TokenEntry> {
    let output = match host.exec(&format!(
        "pveum user token list {} --output-format json",
        pve_user
    )) {
        Ok(output) => output,
        Err(e) => {
            log::warn(&format!("could not list tokens: {}", e));
            return Vec::new();
        }
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn(&format!("could not list tokens: {}", stderr.trim()));
        return Vec::new();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(&stdout) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn(&format!("could not parse token list: {}", e));
            Vec::new()
        }
    }
}

pub fn token_exists(host: &impl RemoteExec, pve_user: &str, token_name: &str) -> bool {
    list_tokens(host, pve_user)
        .iter()
        .any(|entry| entry.token_id == token_name)
}

/// Delete a token by its full id (`user@realm!name`).
pub fn remove_token(host: &impl RemoteExec, full_token_id: &str) -> Result<()> {
    let (pve_user, token_name) = split_token_id(full_token_id)?;
    let output = host.exec(&format!(
        "pveum user token delete {} {}",
        pve_user, token_name
    ))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("delete token {}: {}", full_token_id, stderr.trim());
    }
    Ok(())
}

/// Create a new API token. Fails when the token already exists.
pub fn create_token(host: &impl RemoteExec, pve_user: &str, token_name: &str) -> Result<ApiToken> {
    log::info(&format!("Creating API token {}!{}", pve_user, token_name));
    let output = host.exec(&format!(
        "pveum user token add {} {} --output-format json",
        pve_user, token_name
    ))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("already exists") {
            bail!(
                "token {}!{} already exists; use 'token rotate' to replace it",
                pve_user,
                token_name
            );
        }
        bail!("create token {}!{}: {}", pve_user, token_name, stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: TokenCreateOutput =
        serde_json::from_str(&stdout).context("parse pveum token output")?;
    let token_id = parsed
        .full_token_id
        .or(parsed.token_id)
        .filter(|s| !s.is_empty())
        .context("token output missing token id")?;
    let token_secret = parsed
        .value
        .filter(|s| !s.is_empty())
        .context("token output missing secret value")?;

    log::info(&format!("Token created: {}", token_id));
    Ok(ApiToken {
        token_id,
        token_secret,
    })
}

/// Rotate a token: delete the old one, then create a replacement.
///
/// When deletion of an existing token fails, creation is not attempted —
/// the operator has to resolve the half-rotated state explicitly.
pub fn rotate_token(host: &impl RemoteExec, pve_user: &str, token_name: &str) -> Result<ApiToken> {
    if token_exists(host, pve_user, token_name) {
        let full_token_id = format!("{}!{}", pve_user, token_name);
        log::info(&format!("Rotating: removing old token {}", full_token_id));
        remove_token(host, &full_token_id)
            .with_context(|| format!("rotation aborted, old token {} kept", full_token_id))?;
    }
    create_token(host, pve_user, token_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    fn exec_output(code: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    /// Canned `pveum` responses, recording every command it sees.
    struct ScriptedHost {
        calls: RefCell<Vec<String>>,
        delete_fails: bool,
    }

    impl ScriptedHost {
        fn new(delete_fails: bool) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                delete_fails,
            }
        }
    }

    impl RemoteExec for ScriptedHost {
        fn exec(&self, remote_command: &str) -> anyhow::Result<Output> {
            self.calls.borrow_mut().push(remote_command.to_string());
            if remote_command.contains("token list") {
                return Ok(exec_output(0, r#"[{"tokenid":"terraform"}]"#, ""));
            }
            if remote_command.contains("token delete") {
                if self.delete_fails {
                    return Ok(exec_output(1, "", "permission denied"));
                }
                return Ok(exec_output(0, "", ""));
            }
            Ok(exec_output(
                0,
                r#"{"full-tokenid":"root@pam!terraform","value":"s3cret"}"#,
                "",
            ))
        }
    }

    #[test]
    fn test_rotate_aborts_when_delete_fails() {
        let host = ScriptedHost::new(true);
        let err = rotate_token(&host, "root@pam", "terraform").unwrap_err();
        assert!(format!("{:#}", err).contains("rotation aborted"));
        // the replacement token must never be created half-rotated
        let calls = host.calls.borrow();
        assert!(!calls.iter().any(|c| c.contains("token add")));
    }

    #[test]
    fn test_rotate_deletes_old_then_creates() {
        let host = ScriptedHost::new(false);
        let token = rotate_token(&host, "root@pam", "terraform").unwrap();
        assert_eq!(token.token_id, "root@pam!terraform");
        assert_eq!(token.token_secret, "s3cret");
        let calls = host.calls.borrow();
        let delete_pos = calls.iter().position(|c| c.contains("token delete"));
        let add_pos = calls.iter().position(|c| c.contains("token add"));
        assert!(delete_pos.unwrap() < add_pos.unwrap());
    }

    #[test]
    fn test_create_rejects_existing_token() {
        struct AlwaysExists;
        impl RemoteExec for AlwaysExists {
            fn exec(&self, remote_command: &str) -> anyhow::Result<Output> {
                if remote_command.contains("token add") {
                    return Ok(exec_output(1, "", "token already exists"));
                }
                Ok(exec_output(0, "[]", ""))
            }
        }
        let err = create_token(&AlwaysExists, "root@pam", "terraform").unwrap_err();
        assert!(err.to_string().contains("token rotate"));
    }
}
