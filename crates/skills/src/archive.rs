//! Archive extraction through an external program.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, tracing::debug};

use crate::error::{Context, Error, Result};

/// Unpacks a downloaded zip snapshot into a directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Runs `<program> -q <archive> -d <dest>` (Info-ZIP `unzip` syntax).
#[derive(Debug, Clone)]
pub struct UnzipCommand {
    program: PathBuf,
}

impl UnzipCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for UnzipCommand {
    fn default() -> Self {
        Self::new("unzip")
    }
}

#[async_trait]
impl ArchiveExtractor for UnzipCommand {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(program = %self.program.display(), archive = %archive.display(), "extracting archive");
        let output = tokio::process::Command::new(&self.program)
            .arg("-q")
            .arg(archive)
            .arg("-d")
            .arg(dest)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            return Err(Error::UnzipFailed {
                archive: archive.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_zero_exit_is_unzip_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let err = UnzipCommand::new("false")
            .extract(&tmp.path().join("repo.zip"), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnzipFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_names_it() {
        let tmp = tempfile::tempdir().unwrap();
        let err = UnzipCommand::new("/nonexistent/unzip-binary")
            .extract(&tmp.path().join("repo.zip"), tmp.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/unzip-binary"));
    }
}
