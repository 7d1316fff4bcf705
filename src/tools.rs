use crate::cache::PathCache;
use crate::install::Installer;
use crate::prompt::Prompt;
use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// How a helper is found, installed and recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Stable name used for caching and messages.
    pub name: &'static str,
    /// Archive on the tool server; also the folder under the dependencies root.
    pub package: &'static str,
    pub probe_args: &'static [&'static str],
    /// Whether a probe must exit 0. The ncnn engines have no version flag and
    /// exit non-zero after printing usage.
    pub probe_requires_success: bool,
}

impl ToolSpec {
    pub const FFMPEG: ToolSpec = ToolSpec::named("ffmpeg");
    pub const FFPROBE: ToolSpec = ToolSpec::named("ffprobe").with_package("ffmpeg");
    pub const CUGAN: ToolSpec = ToolSpec::named("cugan").lenient();
    pub const RIFE: ToolSpec = ToolSpec::named("rife-ncnn-vulkan").lenient();

    pub const KNOWN: [ToolSpec; 4] = [Self::FFMPEG, Self::FFPROBE, Self::CUGAN, Self::RIFE];

    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            package: name,
            probe_args: &["-version"],
            probe_requires_success: true,
        }
    }

    pub const fn with_package(mut self, package: &'static str) -> Self {
        self.package = package;
        self
    }

    pub const fn lenient(mut self) -> Self {
        self.probe_requires_success = false;
        self
    }

    pub fn exe_name(&self) -> String {
        format!("{}{}", self.name, std::env::consts::EXE_SUFFIX)
    }

    pub fn known(name: &str) -> Option<ToolSpec> {
        Self::KNOWN.into_iter().find(|t| t.name == name)
    }
}

pub struct ToolResolver {
    cache: PathCache,
    dependencies_dir: PathBuf,
    installer: Installer,
    verify_cached: bool,
}

impl ToolResolver {
    pub fn new(
        cache: PathCache,
        dependencies_dir: PathBuf,
        installer: Installer,
        verify_cached: bool,
    ) -> Self {
        Self {
            cache,
            dependencies_dir,
            installer,
            verify_cached,
        }
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Runnable path for `tool`, or `None` when nothing works and no install
    /// happened (declined, or `allow_install` is false). An install that was
    /// accepted but failed is an error.
    pub fn resolve(
        &self,
        tool: &ToolSpec,
        prompt: &dyn Prompt,
        allow_install: bool,
    ) -> Result<Option<PathBuf>> {
        if let Some(cached) = self.cached_path(tool) {
            return Ok(Some(cached));
        }

        if let Some(found) = self.probe_candidates(tool) {
            return Ok(Some(found));
        }

        if !allow_install {
            return Ok(None);
        }

        println!("\nApp <{}> not found.", tool.name);
        if !prompt.confirm(&format!(
            "Type 'y' to install missing app <{}>:",
            tool.name
        )) {
            tracing::info!(tool = tool.name, "install declined");
            return Ok(None);
        }

        println!("Try installing {}...", tool.name);
        self.installer.install(tool.package)?;

        // One retry only; a second miss must not loop back into installing.
        Ok(self.probe_candidates(tool))
    }

    /// Like [`resolve`](Self::resolve) but a missing tool is an error.
    pub fn require(&self, tool: &ToolSpec, prompt: &dyn Prompt) -> Result<PathBuf> {
        self.resolve(tool, prompt, true)?
            .ok_or_else(|| ToolkitError::tool_not_found(tool.name))
    }

    pub fn candidates(&self, tool: &ToolSpec) -> Vec<PathBuf> {
        let exe = tool.exe_name();
        let package_dir = self.dependencies_dir.join(tool.package);
        let mut out = Vec::with_capacity(3);
        if let Ok(on_path) = which::which(&exe) {
            out.push(on_path);
        }
        out.push(package_dir.join(&exe));
        out.push(package_dir.join("bin").join(&exe));
        out
    }

    fn cached_path(&self, tool: &ToolSpec) -> Option<PathBuf> {
        let cached = PathBuf::from(self.cache.get(tool.name)?);
        if !self.verify_cached || still_present(&cached) {
            tracing::debug!(tool = tool.name, path = %cached.display(), "cache hit");
            return Some(cached);
        }
        tracing::info!(tool = tool.name, path = %cached.display(), "cached path is gone; resolving again");
        self.cache.delete(tool.name);
        None
    }

    fn probe_candidates(&self, tool: &ToolSpec) -> Option<PathBuf> {
        for candidate in self.candidates(tool) {
            if probe_executable(&candidate, tool) {
                tracing::info!(tool = tool.name, path = %candidate.display(), "tool resolved");
                self.cache
                    .put(tool.name, Some(candidate.to_string_lossy().as_ref()));
                return Some(candidate);
            }
        }
        tracing::debug!(tool = tool.name, "no candidate path worked");
        None
    }
}

fn still_present(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    // Entries written before paths were made absolute may be bare names.
    path.components().count() == 1 && which::which(path).is_ok()
}

fn probe_executable(path: &Path, tool: &ToolSpec) -> bool {
    let status = crate::cmd::command(path)
        .args(tool.probe_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() || !tool.probe_requires_success => true,
        Ok(status) => {
            tracing::debug!(tool = tool.name, path = %path.display(), code = ?status.code(), "probe exited non-zero");
            false
        }
        Err(e) => {
            tracing::debug!(tool = tool.name, path = %path.display(), error = %e, "probe failed to launch");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::PackageSource;
    use crate::prompt::NumberRequest;
    use std::cell::Cell;
    use std::rc::Rc;

    struct NeverFetch;

    impl PackageSource for NeverFetch {
        fn fetch(&self, package: &str) -> Result<Vec<u8>> {
            panic!("network must not be contacted (package {package})");
        }
    }

    struct CountingPrompt {
        answer: bool,
        asked: Rc<Cell<u32>>,
    }

    impl Prompt for CountingPrompt {
        fn confirm(&self, _question: &str) -> bool {
            self.asked.set(self.asked.get() + 1);
            self.answer
        }
        fn number(&self, request: &NumberRequest<'_>) -> u32 {
            request.default
        }
        fn choose_many(&self, _question: &str, _choices: &[&str]) -> Vec<String> {
            Vec::new()
        }
        fn pause(&self, _message: &str) {}
    }

    fn resolver_in(dir: &Path) -> ToolResolver {
        let deps = dir.join("dependencies");
        ToolResolver::new(
            PathCache::new(dir.join("cache")),
            deps.clone(),
            Installer::new(Box::new(NeverFetch), deps),
            true,
        )
    }

    const MISSING: ToolSpec = ToolSpec::named("aesimp-test-missing-tool-4711");

    #[test]
    fn known_specs_share_the_ffmpeg_package() {
        assert_eq!(ToolSpec::FFPROBE.package, "ffmpeg");
        assert_eq!(ToolSpec::known("cugan"), Some(ToolSpec::CUGAN));
        assert!(!ToolSpec::RIFE.probe_requires_success);
        assert!(ToolSpec::known("vlc").is_none());
    }

    #[test]
    fn candidates_follow_package_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let tool = MISSING.with_package("pkg");
        let candidates = resolver.candidates(&tool);
        let exe = tool.exe_name();
        assert_eq!(
            candidates,
            vec![
                dir.path().join("dependencies").join("pkg").join(&exe),
                dir.path().join("dependencies").join("pkg").join("bin").join(&exe),
            ]
        );
    }

    #[test]
    fn no_install_means_no_prompt_and_no_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let asked = Rc::new(Cell::new(0));
        let prompt = CountingPrompt {
            answer: true,
            asked: asked.clone(),
        };

        let resolved = resolver.resolve(&MISSING, &prompt, false).expect("resolve");
        assert!(resolved.is_none());
        assert_eq!(asked.get(), 0);
    }

    #[test]
    fn declined_install_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let asked = Rc::new(Cell::new(0));
        let prompt = CountingPrompt {
            answer: false,
            asked: asked.clone(),
        };

        let resolved = resolver.resolve(&MISSING, &prompt, true).expect("resolve");
        assert!(resolved.is_none());
        assert_eq!(asked.get(), 1);

        let err = resolver.require(&MISSING, &prompt).expect_err("missing");
        assert!(matches!(err, ToolkitError::ToolNotFound { .. }));
    }

    #[test]
    fn stale_cache_entry_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let gone = dir.path().join("moved-away").join("tool");
        resolver
            .cache()
            .put(MISSING.name, Some(gone.to_string_lossy().as_ref()));

        let prompt = CountingPrompt {
            answer: false,
            asked: Rc::new(Cell::new(0)),
        };
        let resolved = resolver.resolve(&MISSING, &prompt, false).expect("resolve");
        assert!(resolved.is_none());
        assert_eq!(resolver.cache().get(MISSING.name), None);
    }

    #[test]
    fn unverified_cache_is_trusted_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let deps = dir.path().join("dependencies");
        let resolver = ToolResolver::new(
            PathCache::new(dir.path().join("cache")),
            deps.clone(),
            Installer::new(Box::new(NeverFetch), deps),
            false,
        );
        resolver.cache().put(MISSING.name, Some("/nowhere/tool"));
        let prompt = CountingPrompt {
            answer: false,
            asked: Rc::new(Cell::new(0)),
        };
        let resolved = resolver.resolve(&MISSING, &prompt, false).expect("resolve");
        assert_eq!(resolved, Some(PathBuf::from("/nowhere/tool")));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(path: &Path, body: &str) {
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
        }

        #[test]
        fn resolves_from_package_bin_and_short_circuits_on_second_call() {
            let dir = tempfile::tempdir().expect("tempdir");
            let resolver = resolver_in(dir.path());
            let tool = MISSING.with_package("fakepkg");
            let exe = dir
                .path()
                .join("dependencies")
                .join("fakepkg")
                .join("bin")
                .join(tool.exe_name());
            write_script(&exe, "exit 0");
            let prompt = CountingPrompt {
                answer: false,
                asked: Rc::new(Cell::new(0)),
            };

            let first = resolver.resolve(&tool, &prompt, false).expect("first");
            assert_eq!(first.as_deref(), Some(exe.as_path()));

            // A re-probe would now reject the tool; the cache must answer instead.
            write_script(&exe, "exit 1");
            let second = resolver.resolve(&tool, &prompt, false).expect("second");
            assert_eq!(second, first);
        }

        #[test]
        fn non_zero_probe_depends_on_tool_policy() {
            let dir = tempfile::tempdir().expect("tempdir");
            let resolver = resolver_in(dir.path());
            let strict = MISSING.with_package("engine");
            let exe = dir
                .path()
                .join("dependencies")
                .join("engine")
                .join(strict.exe_name());
            write_script(&exe, "echo usage >&2; exit 255");
            let prompt = CountingPrompt {
                answer: false,
                asked: Rc::new(Cell::new(0)),
            };

            assert!(resolver.resolve(&strict, &prompt, false).expect("strict").is_none());
            let lenient = strict.lenient();
            assert_eq!(
                resolver.resolve(&lenient, &prompt, false).expect("lenient"),
                Some(exe)
            );
        }
    }
}
