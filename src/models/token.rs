//! Proxmox API token models.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A freshly created API token. The secret is only ever shown once by
/// `pveum`, so callers must persist it immediately.
#[derive(Debug, Clone, Serialize)]
pub struct ApiToken {
    pub token_id: String,
    pub token_secret: String,
}

/// One row of `pveum user token list --output-format json`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    #[serde(rename = "tokenid")]
    pub token_id: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Unix timestamp; 0 or absent means no expiry.
    #[serde(default)]
    pub expire: Option<i64>,
}

/// Raw output of `pveum user token add --output-format json`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenCreateOutput {
    /// Newer pveum prints `full-tokenid`, older prints `tokenid`.
    #[serde(rename = "full-tokenid", default)]
    pub full_token_id: Option<String>,
    #[serde(rename = "tokenid", default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Split a full token id (`user@realm!name`) into user and token name.
pub fn split_token_id(token_id: &str) -> Result<(&str, &str)> {
    match token_id.split_once('!') {
        Some((user, name)) if !user.is_empty() && !name.is_empty() => Ok((user, name)),
        _ => bail!("invalid token id '{}', expected user@realm!name", token_id),
    }
}
