//! Project path resolution and file layout.

use crate::constants;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub tfvars: PathBuf,
    pub credentials: PathBuf,
    pub settings: PathBuf,
    pub lock: PathBuf,
    pub history: PathBuf,
}

impl ProjectPaths {
    /// Resolve project paths from CLI arg, env var, or auto-detection.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var("SELFHOST_DEPLOY_ROOT") {
            return Ok(Self::from_root(PathBuf::from(root)));
        }
        if let Some(found) = find_project_root()? {
            return Ok(Self::from_root(found));
        }
        let cwd = env::current_dir().context("resolve current directory")?;
        Ok(Self::from_root(cwd))
    }

    /// Create project paths from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        let tfvars = root.join(constants::TFVARS_FILE);
        let credentials = root.join(constants::CREDENTIALS_FILE);
        let settings = root.join(constants::SETTINGS_FILE);
        let lock = root.join(constants::LOCK_FILE);
        let history = root.join(constants::HISTORY_FILE);
        Self {
            root,
            tfvars,
            credentials,
            settings,
            lock,
            history,
        }
    }
}

fn find_project_root() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir().context("resolve current directory")?;
    for ancestor in cwd.ancestors() {
        if looks_like_root(ancestor) {
            return Ok(Some(ancestor.to_path_buf()));
        }
    }
    Ok(None)
}

fn looks_like_root(path: &Path) -> bool {
    path.join(constants::TFVARS_FILE).is_file() || path.join("main.tf").is_file()
}

impl std::fmt::Display for ProjectPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project@{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        let paths = ProjectPaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.root, PathBuf::from("/test"));
        assert_eq!(paths.tfvars, PathBuf::from("/test/terraform.tfvars"));
        assert_eq!(
            paths.credentials,
            PathBuf::from("/test/infisical_token.auto.tfvars")
        );
        assert_eq!(paths.settings, PathBuf::from("/test/deploy.toml"));
        assert_eq!(paths.lock, PathBuf::from("/test/deploy.lock"));
        assert_eq!(paths.history, PathBuf::from("/test/deploy-history.log"));
    }

    #[test]
    fn test_looks_like_root_detects_tfvars() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!looks_like_root(dir.path()));
        std::fs::write(dir.path().join("terraform.tfvars"), "").unwrap();
        assert!(looks_like_root(dir.path()));
    }
}
