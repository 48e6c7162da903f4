//! Archive extraction

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::process::{Invocation, ProcessError, ProcessExecutor};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("tar exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },
}

/// Capability to unpack a bundle archive into a directory
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts `archive` into `dest`, dropping the first
    /// `strip_components` path components of every entry
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        strip_components: u32,
    ) -> Result<(), ExtractError>;
}

/// Extractor that shells out to `tar`
pub struct TarExtractor {
    executor: Arc<dyn ProcessExecutor>,
    program: String,
}

impl TarExtractor {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            executor,
            program: "tar".to_string(),
        }
    }
}

#[async_trait]
impl ArchiveExtractor for TarExtractor {
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        strip_components: u32,
    ) -> Result<(), ExtractError> {
        let invocation = Invocation::new(&self.program)
            .arg("-xf")
            .arg(archive.to_string_lossy())
            .arg(format!("--strip-components={}", strip_components))
            .arg("-C")
            .arg(dest.to_string_lossy());

        let output = self.executor.run(invocation).await?;
        if !output.success() {
            return Err(ExtractError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandExecutor, ProcessOutput};
    use crate::testing::FakeExecutor;

    #[tokio::test]
    async fn test_tar_invocation() {
        let executor = Arc::new(FakeExecutor::new());
        let extractor = TarExtractor::new(executor.clone());

        extractor
            .extract(Path::new("/home/app/cv-1.tar.gz"), Path::new("/home/app/tf-config"), 1)
            .await
            .unwrap();

        let calls = executor.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].command_line(),
            "tar -xf /home/app/cv-1.tar.gz --strip-components=1 -C /home/app/tf-config"
        );
    }

    #[tokio::test]
    async fn test_tar_failure_is_reported() {
        let executor = Arc::new(FakeExecutor::new());
        executor.respond("tar", ProcessOutput {
            stdout: String::new(),
            stderr: "tar: Error is not recoverable\n".to_string(),
            exit_code: 2,
        });
        let extractor = TarExtractor::new(executor);

        let err = extractor
            .extract(Path::new("bad.tar.gz"), Path::new("/tmp/out"), 1)
            .await
            .unwrap_err();

        match err {
            ExtractError::Failed { exit_code, stderr } => {
                assert_eq!(exit_code, 2);
                assert_eq!(stderr, "tar: Error is not recoverable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_tar_strips_top_level_directory() {
        let scratch = tempfile::tempdir().unwrap();
        let source = scratch.path().join("bundle");
        std::fs::create_dir_all(source.join("modules")).unwrap();
        std::fs::write(source.join("main.tf"), "terraform {}").unwrap();
        std::fs::write(source.join("modules").join("vpc.tf"), "").unwrap();

        let archive = scratch.path().join("cv-1-1.tar.gz");
        let packed = std::process::Command::new("tar")
            .arg("-czf")
            .arg(&archive)
            .arg("-C")
            .arg(scratch.path())
            .arg("bundle")
            .status()
            .unwrap();
        assert!(packed.success());

        let dest = scratch.path().join("tf-config");
        std::fs::create_dir_all(&dest).unwrap();

        TarExtractor::new(Arc::new(CommandExecutor))
            .extract(&archive, &dest, 1)
            .await
            .unwrap();

        assert!(dest.join("main.tf").is_file());
        assert!(dest.join("modules").join("vpc.tf").is_file());
        assert!(!dest.join("bundle").exists());
    }
}
