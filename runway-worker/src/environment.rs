//! Execution environment management
//!
//! Each run gets a working directory and a bundle download directory that
//! it owns exclusively for its whole lifetime. Both are removed when the
//! run ends, whatever the outcome, so nothing leaks into the next run that
//! shares the same mount. Paths never depend on the message's bundle key,
//! so a run cannot reach files it does not own.
//!
//! The root is acquired as an [`EnvironmentGuard`]. Releasing the guard
//! cleans up; a guard dropped without release (panic, cancelled run)
//! cleans up synchronously in `Drop`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::archive::{ArchiveExtractor, ExtractError};

/// Bundles are packaged with a single top-level directory
const BUNDLE_STRIP_COMPONENTS: u32 = 1;

/// Run-owned directory under the configured download directory
pub const BUNDLE_DIR_NAME: &str = "runway-bundles";

/// The ephemeral working directory of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    /// Directory the engine runs in; holds the extracted configuration
    pub root: PathBuf,
    /// Directory holding the downloaded archive
    pub bundle_dir: PathBuf,
    /// Download destination of the bundle archive, inside `bundle_dir`
    pub bundle_path: PathBuf,
    /// Engine version this run requires
    pub engine_version: String,
}

/// Creates, fills and tears down execution environments
pub struct EnvironmentManager {
    work_dir: PathBuf,
    download_dir: PathBuf,
    engine_version: String,
    extractor: Arc<dyn ArchiveExtractor>,
}

impl EnvironmentManager {
    /// Creates a new environment manager
    ///
    /// # Arguments
    /// * `work_dir` - Root directory every run executes in
    /// * `download_dir` - Parent of the run-owned bundle directory; must not be inside `work_dir`
    /// * `engine_version` - Engine version pinned for every run
    /// * `extractor` - Archive extraction capability
    pub fn new(
        work_dir: PathBuf,
        download_dir: PathBuf,
        engine_version: String,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            work_dir,
            download_dir,
            engine_version,
            extractor,
        }
    }

    /// Returns the root directory, creating it if needed
    ///
    /// Creation is idempotent: an existing directory is not an error.
    pub async fn resolve_root(&self) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        Ok(self.work_dir.clone())
    }

    /// Directory bundles are downloaded into
    pub fn bundle_dir(&self) -> PathBuf {
        self.download_dir.join(BUNDLE_DIR_NAME)
    }

    /// Acquires a fresh environment for a run
    ///
    /// Residue from a run that never reached cleanup (e.g. a killed worker)
    /// is removed before the directories are recreated.
    pub async fn acquire(&self) -> io::Result<EnvironmentGuard> {
        let bundle_dir = self.bundle_dir();
        let environment = ExecutionEnvironment {
            root: self.work_dir.clone(),
            bundle_path: bundle_dir.join(format!(
                "bundle-{}.tar.gz",
                uuid::Uuid::new_v4().simple()
            )),
            bundle_dir,
            engine_version: self.engine_version.clone(),
        };

        for dir in [&environment.root, &environment.bundle_dir] {
            if tokio::fs::try_exists(dir).await? {
                warn!("{} already exists, removing stale content", dir.display());
            }
        }
        cleanup(&environment).await?;

        tokio::fs::create_dir_all(&environment.bundle_dir).await?;
        self.resolve_root().await?;

        debug!("Acquired execution root {}", environment.root.display());
        Ok(EnvironmentGuard {
            environment,
            released: false,
        })
    }

    /// Writes a bundle stream fully to the environment's download path
    ///
    /// The stream may not be seekable, so extraction always works on the
    /// local copy.
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn download<R>(&self, environment: &ExecutionEnvironment, mut stream: R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut file = tokio::fs::File::create(&environment.bundle_path).await?;
        let written = tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Extracts the downloaded bundle into the root, dropping the bundle's
    /// own top-level directory
    pub async fn extract(&self, environment: &ExecutionEnvironment) -> Result<(), ExtractError> {
        self.extractor
            .extract(
                &environment.bundle_path,
                &environment.root,
                BUNDLE_STRIP_COMPONENTS,
            )
            .await
    }
}

/// Removes an environment's root and bundle directories
///
/// Missing paths are not errors, so a second call is a no-op.
pub async fn cleanup(environment: &ExecutionEnvironment) -> io::Result<()> {
    ignore_not_found(tokio::fs::remove_dir_all(&environment.root).await)?;
    ignore_not_found(tokio::fs::remove_dir_all(&environment.bundle_dir).await)?;
    Ok(())
}

fn cleanup_blocking(environment: &ExecutionEnvironment) -> io::Result<()> {
    ignore_not_found(std::fs::remove_dir_all(&environment.root))?;
    ignore_not_found(std::fs::remove_dir_all(&environment.bundle_dir))?;
    Ok(())
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Scoped ownership of an execution environment
pub struct EnvironmentGuard {
    environment: ExecutionEnvironment,
    released: bool,
}

impl EnvironmentGuard {
    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    /// Cleans the environment up and gives up ownership
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        let result = cleanup(&self.environment).await;
        if result.is_ok() {
            info!(
                "Cleaned up execution root {}",
                self.environment.root.display()
            );
        }
        result
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = cleanup_blocking(&self.environment) {
            warn!(
                "Failed to cleanup execution root {} on drop: {}",
                self.environment.root.display(),
                e
            );
        }
    }
}
