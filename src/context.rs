// File: ./src/context.rs
/*! Where the application keeps its files.

`AppContext` hides how the config directory is found:

- `StandardContext` uses `directories::ProjectDirs`, or an override root
  given on the command line.
- `TestContext` uses a unique temporary directory removed on drop.

Code that touches the filesystem takes a `&dyn AppContext` explicitly.
*/

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// With `Some(root)`, the config lives in `<root>/config`.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }
}

impl AppContext for StandardContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("config"));
        }
        let proj = ProjectDirs::from("com", "todomd", "todomd")
            .ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.config_dir().to_path_buf())
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Picks a unique directory under the OS temp dir without creating it.
    /// `get_config_dir` creates it on first use; drop removes whatever exists.
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("todomd_test_{}", uuid::Uuid::new_v4()));
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creates_lazily_and_cleans_up() {
        let ctx = TestContext::new();
        let root = ctx.root.clone();
        assert!(!root.exists());

        let dir = ctx.get_config_dir().unwrap();
        assert!(dir.is_dir());
        assert_eq!(ctx.get_config_file_path().unwrap(), dir.join("config.toml"));

        drop(ctx);
        assert!(!root.exists());
    }

    #[test]
    fn override_root_holds_config() {
        let scratch = TestContext::new();
        let ctx = StandardContext::new(Some(scratch.root.clone()));
        let dir = ctx.get_config_dir().unwrap();
        assert_eq!(dir, scratch.root.join("config"));
        assert!(dir.is_dir());
    }
}
