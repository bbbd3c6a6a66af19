//! Flat `key = "value"` variables file, read and written line by line.
//!
//! The file is shared with Terraform, so edits must be surgical: updating
//! a key rewrites only its line, everything else is preserved verbatim.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct TfvarsFile {
    path: PathBuf,
}

impl TfvarsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value by key. Returns `None` when the file or key is absent.
    pub fn read_key(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        Ok(find_value(&content, key))
    }

    /// Write or update a key. Existing keys are replaced in place, new keys
    /// are appended.
    pub fn write_key(&self, key: &str, value: &str) -> Result<()> {
        let content = if self.path.exists() {
            fs::read_to_string(&self.path)
                .with_context(|| format!("read {}", self.path.display()))?
        } else {
            String::new()
        };
        let updated = upsert_line(&content, key, value);
        fs::write(&self.path, updated)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Read a key and interpret it as a boolean (`"true"` only).
    pub fn read_bool(&self, key: &str) -> Result<bool> {
        Ok(self.read_key(key)?.as_deref() == Some("true"))
    }
}

/// Whether a line assigns the given key (`key = ...`, ignoring leading
/// whitespace).
fn line_assigns(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(key) {
        Some(rest) => rest.trim_start().starts_with('='),
        None => false,
    }
}

fn find_value(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        if !line_assigns(line, key) {
            continue;
        }
        let raw = line.split_once('=')?.1.trim();
        // Strip a trailing comment on unquoted values only.
        let value = if let Some(stripped) = raw.strip_prefix('"') {
            stripped.split('"').next().unwrap_or("")
        } else {
            raw.split('#').next().unwrap_or("").trim()
        };
        if value.is_empty() {
            return None;
        }
        return Some(value.to_string());
    }
    None
}

fn upsert_line(content: &str, key: &str, value: &str) -> String {
    let new_line = format!("{} = \"{}\"", key, value);
    if content.lines().any(|line| line_assigns(line, key)) {
        let mut out: Vec<String> = Vec::new();
        for line in content.lines() {
            if line_assigns(line, key) {
                out.push(new_line.clone());
            } else {
                out.push(line.to_string());
            }
        }
        let mut joined = out.join("\n");
        // keep the file's final-newline state as found
        if content.ends_with('\n') {
            joined.push('\n');
        }
        joined
    } else {
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&new_line);
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tfvars_with(content: &str) -> (TempDir, TfvarsFile) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("terraform.tfvars");
        fs::write(&path, content).unwrap();
        (dir, TfvarsFile::new(path))
    }

    #[test]
    fn test_read_quoted_value() {
        let (_dir, tfvars) = tfvars_with("docker_host_ip = \"10.0.0.5\"\n");
        assert_eq!(
            tfvars.read_key("docker_host_ip").unwrap().as_deref(),
            Some("10.0.0.5")
        );
    }

    #[test]
    fn test_read_unquoted_value() {
        let (_dir, tfvars) = tfvars_with("infisical_port = 8080\n");
        assert_eq!(
            tfvars.read_key("infisical_port").unwrap().as_deref(),
            Some("8080")
        );
    }

    #[test]
    fn test_read_missing_key_and_missing_file() {
        let (_dir, tfvars) = tfvars_with("a = \"1\"\n");
        assert!(tfvars.read_key("b").unwrap().is_none());

        let absent = TfvarsFile::new("/nonexistent/terraform.tfvars");
        assert!(absent.read_key("a").unwrap().is_none());
    }

    #[test]
    fn test_key_prefix_does_not_match() {
        let (_dir, tfvars) = tfvars_with("pm_host_backup = \"x\"\npm_host = \"y\"\n");
        assert_eq!(tfvars.read_key("pm_host").unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn test_write_replaces_existing_key_in_place() {
        let (_dir, tfvars) =
            tfvars_with("a = \"1\"\nenable_infisical = \"false\"\nz = \"9\"\n");
        tfvars.write_key("enable_infisical", "true").unwrap();
        let content = fs::read_to_string(tfvars.path()).unwrap();
        assert_eq!(content, "a = \"1\"\nenable_infisical = \"true\"\nz = \"9\"\n");
    }

    #[test]
    fn test_write_replace_preserves_missing_final_newline() {
        let (_dir, tfvars) = tfvars_with("a = \"1\"\nb = \"2\"");
        tfvars.write_key("a", "9").unwrap();
        let content = fs::read_to_string(tfvars.path()).unwrap();
        assert_eq!(content, "a = \"9\"\nb = \"2\"");
    }

    #[test]
    fn test_write_appends_new_key() {
        let (_dir, tfvars) = tfvars_with("a = \"1\"\n");
        tfvars.write_key("docker_host_ip", "10.0.0.5").unwrap();
        let content = fs::read_to_string(tfvars.path()).unwrap();
        assert_eq!(content, "a = \"1\"\ndocker_host_ip = \"10.0.0.5\"\n");
    }

    #[test]
    fn test_write_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("terraform.tfvars");
        let tfvars = TfvarsFile::new(&path);
        tfvars.write_key("a", "1").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = \"1\"\n");
    }

    #[test]
    fn test_empty_quoted_value_reads_as_none() {
        let (_dir, tfvars) = tfvars_with("token = \"\"\n");
        assert!(tfvars.read_key("token").unwrap().is_none());
    }

    #[test]
    fn test_read_bool() {
        let (_dir, tfvars) = tfvars_with("enable_infisical = \"true\"\nother = \"yes\"\n");
        assert!(tfvars.read_bool("enable_infisical").unwrap());
        assert!(!tfvars.read_bool("other").unwrap());
        assert!(!tfvars.read_bool("missing").unwrap());
    }

    #[test]
    fn test_unquoted_trailing_comment_stripped() {
        let (_dir, tfvars) = tfvars_with("count = 3 # containers\n");
        assert_eq!(tfvars.read_key("count").unwrap().as_deref(), Some("3"));
    }
}
