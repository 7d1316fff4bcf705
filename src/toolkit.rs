use crate::cache::PathCache;
use crate::cmd::Invocation;
use crate::config::{self, ToolkitSettings};
use crate::install::{HttpPackageSource, Installer, PackageSource};
use crate::paths::AppPaths;
use crate::probe::{self, MediaDescriptor};
use crate::prompt::{NumberRequest, Prompt};
use crate::runner::ProcessRunner;
use crate::tools::{ToolResolver, ToolSpec};
use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};

/// Everything a recipe needs for one run of the program.
pub struct Toolkit {
    pub paths: AppPaths,
    pub settings: ToolkitSettings,
    resolver: ToolResolver,
    runner: ProcessRunner,
    prompt: Box<dyn Prompt>,
}

impl Toolkit {
    /// Loads settings from `paths` and talks to the configured tool server.
    pub fn open(paths: AppPaths, prompt: Box<dyn Prompt>, show_progress: bool) -> Result<Self> {
        paths.ensure_dirs()?;
        let settings = config::load_settings(&paths)?;
        let source = HttpPackageSource::new(&settings.server_url, settings.http_timeout_secs);
        Ok(Self::with_source(
            paths,
            settings,
            Box::new(source),
            prompt,
            ProcessRunner::new(show_progress),
        ))
    }

    pub fn with_source(
        paths: AppPaths,
        settings: ToolkitSettings,
        source: Box<dyn PackageSource>,
        prompt: Box<dyn Prompt>,
        runner: ProcessRunner,
    ) -> Self {
        let paths = match settings.send_to_dir.clone() {
            Some(dir) => paths.with_send_to_dir(Some(dir)),
            None => paths,
        };
        let installer = Installer::new(source, paths.dependencies_dir());
        let resolver = ToolResolver::new(
            PathCache::new(paths.cache_dir()),
            paths.dependencies_dir(),
            installer,
            settings.verify_cached_paths,
        );
        Self {
            paths,
            settings,
            resolver,
            runner,
            prompt,
        }
    }

    pub fn resolver(&self) -> &ToolResolver {
        &self.resolver
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    /// Path of `tool`, installing it with consent; missing is an error.
    pub fn require_tool(&self, tool: &ToolSpec) -> Result<PathBuf> {
        self.resolver.require(tool, self.prompt.as_ref())
    }

    /// Metadata for `path`; only a missing ffprobe is an error.
    pub fn probe(&self, path: &Path) -> Result<MediaDescriptor> {
        let ffprobe = self
            .resolver
            .resolve(&ToolSpec::FFPROBE, self.prompt.as_ref(), true)?
            .ok_or_else(|| ToolkitError::tool_not_found("ffprobe"))?;
        Ok(probe::describe(&ffprobe, path))
    }

    pub fn run(&self, invocation: &Invocation) -> Result<()> {
        self.runner.run(invocation)
    }

    /// Runs `primary`; if it fails, reports it and runs `fallback` instead.
    pub fn run_with_fallback(&self, primary: &Invocation, fallback: &Invocation) -> Result<()> {
        match self.runner.run(primary) {
            Ok(()) => Ok(()),
            Err(ToolkitError::ProcessFailed { label, code, .. }) => {
                tracing::info!(label = %label, code = ?code, fallback = %fallback.label, "primary invocation failed; running fallback");
                println!("{label} failed, retrying with {}", fallback.label);
                self.runner.run(fallback)
            }
            Err(other) => Err(other),
        }
    }

    pub fn ask_number(&self, min: u32, max: u32, default: u32, info: Option<&str>) -> u32 {
        self.prompt.number(&NumberRequest {
            min,
            max,
            default,
            info,
        })
    }
}
