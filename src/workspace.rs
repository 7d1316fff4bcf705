use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
pub struct FrameWorkspace {
    dir: TempDir,
}

impl FrameWorkspace {
    pub fn beside(input: &Path) -> std::io::Result<Self> {
        let parent = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "frames".to_string());
        let dir = tempfile::Builder::new()
            .prefix(&format!("{stem}-frames-"))
            .tempdir_in(parent)?;
        tracing::debug!(dir = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `<workspace>/<name>`, created.
    pub fn subdir(&self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.dir.path().join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Removes the folder, reporting failure instead of ignoring it.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|source| {
            tracing::warn!(dir = %path.display(), error = %source, "workspace not removed");
            ToolkitError::Cleanup { path, source }
        })
    }

    /// Runs `job` inside a fresh workspace and always removes it afterwards.
    /// Returns the job result and the cleanup result separately so a cleanup
    /// problem never masks the job's own outcome.
    pub fn scoped<T, E>(
        input: &Path,
        job: impl FnOnce(&FrameWorkspace) -> std::result::Result<T, E>,
    ) -> Result<(std::result::Result<T, E>, Result<()>)> {
        let workspace = Self::beside(input)?;
        let result = job(&workspace);
        let cleanup = workspace.close();
        Ok((result, cleanup))
    }
}
