//! Filesystem script source
//!
//! Locators are paths relative to a root directory. Absolute paths and parent
//! traversal are rejected so a manifest cannot read outside the scripts tree.

use crate::cancel::CancellationToken;
use crate::ports::DeploySource;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `locator` under the root.
    fn path_for(&self, locator: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(locator);
        if locator.is_empty() {
            bail!("Empty script locator");
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!(
                    "Script locator must be a relative path inside the scripts root: {locator}"
                ),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DeploySource for FileSystemSource {
    async fn get_script_content(
        &self,
        locator: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        let path = self.path_for(locator)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Script file not found");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("tables")).unwrap();
        std::fs::write(
            temp_dir.path().join("tables/device_types.sql"),
            "create table t();",
        )
        .unwrap();

        let source = FileSystemSource::new(temp_dir.path());
        let content = source
            .get_script_content("tables/device_types.sql", &CancellationToken::none())
            .await
            .unwrap();
        assert_eq!(content.as_deref(), Some("create table t();"));
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileSystemSource::new(temp_dir.path());
        let content = source
            .get_script_content("missing.sql", &CancellationToken::none())
            .await
            .unwrap();
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn test_rejects_escaping_locators() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileSystemSource::new(temp_dir.path());
        let cancel = CancellationToken::none();

        assert!(source.get_script_content("../secret.sql", &cancel).await.is_err());
        assert!(source.get_script_content("a/../../b.sql", &cancel).await.is_err());
        assert!(source.get_script_content("/etc/passwd", &cancel).await.is_err());
        assert!(source.get_script_content("", &cancel).await.is_err());
    }
}
