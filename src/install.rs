use crate::{Result, ToolkitError};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const APPLICATION_PATH: [&str; 2] = ["aesimp-tools", "application"];
const USER_AGENT: &str = concat!("aesimp-tools/", env!("CARGO_PKG_VERSION"));

/// Where package archives come from.
pub trait PackageSource {
    /// Full archive bytes for `package`.
    fn fetch(&self, package: &str) -> Result<Vec<u8>>;
}

pub struct HttpPackageSource {
    server_url: String,
    agent: ureq::Agent,
}

impl HttpPackageSource {
    pub fn new(server_url: &str, timeout_secs: u64) -> Self {
        let mut config = ureq::Agent::config_builder();
        config = config
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
            .user_agent(USER_AGENT);
        Self {
            server_url: server_url.trim().trim_end_matches('/').to_string(),
            agent: config.build().into(),
        }
    }

    pub fn package_url(&self, package: &str) -> Result<url::Url> {
        package_url(&self.server_url, package)
    }
}

impl PackageSource for HttpPackageSource {
    fn fetch(&self, package: &str) -> Result<Vec<u8>> {
        let url = self.package_url(package)?;
        tracing::info!(package, url = %url, "fetching package archive");

        let resp = self
            .agent
            .get(url.as_str())
            .header("Content-Type", "application/octet-stream")
            .call()
            .map_err(|e| ToolkitError::install_failed(package, format!("download failed ({e})")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ToolkitError::install_failed(
                package,
                format!("download failed (status={status})"),
            ));
        }

        let mut reader = resp.into_body().into_reader();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ToolkitError::install_failed(package, format!("download interrupted ({e})")))?;
        tracing::debug!(package, bytes = bytes.len(), "package archive received");
        Ok(bytes)
    }
}

pub fn package_url(server_url: &str, package: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(server_url)
        .map_err(|e| ToolkitError::install_failed(package, format!("bad server url ({e})")))?;
    if url.scheme() != "https" {
        return Err(ToolkitError::install_failed(
            package,
            format!("refusing non-https server {server_url}"),
        ));
    }
    url.path_segments_mut()
        .map_err(|_| ToolkitError::install_failed(package, "server url cannot hold a path"))?
        .pop_if_empty()
        .extend(APPLICATION_PATH)
        .push(package);
    Ok(url)
}

pub struct Installer {
    source: Box<dyn PackageSource>,
    dependencies_dir: PathBuf,
}

impl Installer {
    pub fn new(source: Box<dyn PackageSource>, dependencies_dir: PathBuf) -> Self {
        Self {
            source,
            dependencies_dir,
        }
    }

    /// Downloads `package` and unpacks it, keeping the archive's own folders.
    pub fn install(&self, package: &str) -> Result<()> {
        let bytes = self.source.fetch(package).map_err(|e| match e {
            ToolkitError::InstallFailed { .. } => e,
            other => ToolkitError::install_failed(package, other),
        })?;

        std::fs::create_dir_all(&self.dependencies_dir)
            .map_err(|e| ToolkitError::install_failed(package, e))?;
        let written = extract_zip(&bytes, &self.dependencies_dir)
            .map_err(|e| ToolkitError::install_failed(package, e))?;
        tracing::info!(
            package,
            files = written,
            dir = %self.dependencies_dir.display(),
            "package installed"
        );
        Ok(())
    }
}

/// Unpacks every entry under `out_dir`; returns the number of files written.
pub fn extract_zip(bytes: &[u8], out_dir: &Path) -> std::result::Result<usize, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("failed to read zip archive: {e}"))?;

    let mut written = 0_usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("zip read failed: {e}"))?;

        let name = entry.name().replace('\\', "/");
        let rel_path = Path::new(name.trim_start_matches("./"));
        if rel_path.as_os_str().is_empty() {
            continue;
        }
        if rel_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        }) {
            return Err(format!("unsafe zip path: {name}"));
        }

        let out_path = out_dir.join(rel_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| e.to_string())?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let mut out_file = std::fs::File::create(&out_path)
            .map_err(|e| format!("cannot create {}: {e}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out_file)
            .map_err(|e| format!("cannot write {}: {e}", out_path.display()))?;
        drop(out_file);

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| e.to_string())?;
        }

        written += 1;
    }

    Ok(written)
}
