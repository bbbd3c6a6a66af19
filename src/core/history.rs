//! Append-only run history for deployment phases.
//!
//! Each line is a JSON entry carrying a hash chain so `history verify` can
//! detect truncation or edits after the fact.

use crate::constants;
use crate::core::paths::ProjectPaths;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Phase or command name (container, service, bootstrap, ...).
    pub phase: String,
    pub actor: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Record the outcome of a phase.
pub fn record(paths: &ProjectPaths, phase: &str, success: bool, error: Option<String>) -> Result<()> {
    let entries = read(paths, None)?;
    let prev_hash = entries.last().and_then(|e| e.entry_hash.clone());

    let mut entry = HistoryEntry {
        timestamp: Utc::now(),
        phase: phase.to_string(),
        actor: detect_actor(),
        success,
        error,
        prev_hash,
        entry_hash: None,
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize history entry")?;
    append_line(paths, &line)
}

/// Compute canonical hash for an entry (excludes the entry_hash field).
fn compute_entry_hash(entry: &HistoryEntry) -> Result<String> {
    let mut value = serde_json::to_value(entry).context("serialize for hash")?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("entry_hash");
    }
    let canonical = canonicalize_value(&value);
    let canonical_str = serde_json::to_string(&canonical).context("serialize canonical json")?;
    let hash = Sha256::digest(canonical_str.as_bytes());
    Ok(format!("{:064x}", hash))
}

/// Canonicalize JSON by recursively sorting object keys.
fn canonicalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize_value(&map[k]));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize_value).collect())
        }
        other => other.clone(),
    }
}

fn append_line(paths: &ProjectPaths, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.history)
        .with_context(|| format!("open history log {}", paths.history.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("lock history log {}", paths.history.display()))?;
    writeln!(file, "{}", line).context("write history entry")?;

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::HISTORY_LOG_MODE);
        fs::set_permissions(&paths.history, perm)
            .context("set history log permissions")?;
    }

    Ok(())
}

/// Read history entries, newest last. `limit` keeps only the tail.
pub fn read(paths: &ProjectPaths, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
    if !paths.history.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&paths.history)
        .with_context(|| format!("open history log {}", paths.history.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut malformed = 0usize;

    for line in reader.lines() {
        let line = line.context("read history line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        crate::util::log::warn(&format!("{} malformed history entries skipped", malformed));
    }

    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }

    Ok(entries)
}

/// Verify the integrity of the history chain. Returns (total, errors).
pub fn verify_chain(paths: &ProjectPaths) -> Result<(usize, Vec<String>)> {
    let entries = read(paths, None)?;
    let mut errors = Vec::new();
    let mut prev_entry_hash: Option<String> = None;

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && entry.prev_hash != prev_entry_hash {
            errors.push(format!(
                "entry {}: prev_hash mismatch (expected {:?}, got {:?})",
                i + 1,
                prev_entry_hash,
                entry.prev_hash
            ));
        }

        if let Some(stored_hash) = &entry.entry_hash {
            match compute_entry_hash(entry) {
                Ok(computed) => {
                    if &computed != stored_hash {
                        errors.push(format!("entry {}: entry_hash mismatch (tampered?)", i + 1));
                    }
                }
                Err(e) => errors.push(format!("entry {}: cannot compute hash: {}", i + 1, e)),
            }
        }

        prev_entry_hash = entry.entry_hash.clone();
    }

    Ok((entries.len(), errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths() -> (TempDir, ProjectPaths) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::from_root(dir.path().to_path_buf());
        (dir, paths)
    }

    #[test]
    fn test_record_and_read_roundtrip() {
        let (_dir, paths) = test_paths();
        record(&paths, "container", true, None).unwrap();
        let entries = read(&paths, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].phase, "container");
        assert!(entries[0].success);
        assert!(entries[0].entry_hash.is_some());
    }

    #[test]
    fn test_read_with_limit_keeps_tail() {
        let (_dir, paths) = test_paths();
        for i in 0..5 {
            record(&paths, &format!("phase_{}", i), true, None).unwrap();
        }
        let entries = read(&paths, Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].phase, "phase_3");
    }

    #[test]
    fn test_read_nonexistent_is_empty() {
        let (_dir, paths) = test_paths();
        assert!(read(&paths, None).unwrap().is_empty());
    }

    #[test]
    fn test_verify_chain_ok() {
        let (_dir, paths) = test_paths();
        record(&paths, "container", true, None).unwrap();
        record(&paths, "service", true, None).unwrap();
        record(&paths, "bootstrap", false, Some("API not ready".into())).unwrap();
        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 3);
        assert!(errors.is_empty(), "errors: {:?}", errors);
    }

    #[test]
    fn test_verify_chain_detects_tamper() {
        let (_dir, paths) = test_paths();
        record(&paths, "container", true, None).unwrap();
        record(&paths, "service", true, None).unwrap();

        let content = fs::read_to_string(&paths.history).unwrap();
        let tampered = content.replace("service", "TAMPERED");
        fs::write(&paths.history, tampered).unwrap();

        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 2);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_failure_entry_carries_error() {
        let (_dir, paths) = test_paths();
        record(&paths, "service", false, Some("apply failed".into())).unwrap();
        let entries = read(&paths, None).unwrap();
        assert!(!entries[0].success);
        assert_eq!(entries[0].error.as_deref(), Some("apply failed"));
    }
}
