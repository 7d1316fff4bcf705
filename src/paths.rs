use std::path::{Path, PathBuf};

pub const BASE_DIR_ENV: &str = "AESIMP_BASE_DIR";
const APP_DIR_NAME: &str = "aesimp-tools";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
    send_to_override: Option<PathBuf>,
}

impl AppPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            send_to_override: None,
        }
    }

    /// Redirect the launcher directory (settings override or tests).
    pub fn with_send_to_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.send_to_override = dir;
        self
    }

    /// Resolved helper locations; can be deleted at any time.
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join("cache")
    }

    /// Unpacked helper tools, one folder per install package.
    pub fn dependencies_dir(&self) -> PathBuf {
        self.base_dir.join("dependencies")
    }

    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.dependencies_dir().join(package)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join("settings.json")
    }

    /// Where `install` places its own copy of the running executable.
    pub fn installed_exe_path(&self) -> PathBuf {
        let mut path = self.base_dir.join("aesimp");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path
    }

    /// Folder the file manager reads "send to" entries from.
    pub fn send_to_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.send_to_override {
            return Some(dir.clone());
        }
        default_send_to_dir()
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.cache_dir())?;
        std::fs::create_dir_all(self.dependencies_dir())?;
        std::fs::create_dir_all(self.config_dir())?;
        Ok(())
    }

    pub fn normalize_base_dir(base_dir: &Path) -> PathBuf {
        if base_dir.is_absolute() {
            return base_dir.to_path_buf();
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(base_dir))
            .unwrap_or_else(|_| base_dir.to_path_buf())
    }
}

pub fn default_base_dir() -> Option<PathBuf> {
    if let Some(dir) = env_dir(BASE_DIR_ENV) {
        return Some(dir);
    }

    if cfg!(windows) {
        return env_dir("LOCALAPPDATA").map(|d| d.join(APP_DIR_NAME));
    }

    if let Some(data_home) = env_dir("XDG_DATA_HOME") {
        return Some(data_home.join(APP_DIR_NAME));
    }
    env_dir("HOME").map(|home| home.join(".local").join("share").join(APP_DIR_NAME))
}

fn default_send_to_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        return env_dir("APPDATA").map(|d| {
            d.join("Microsoft")
                .join("Windows")
                .join("SendTo")
        });
    }

    // Nautilus passes the selection as arguments to scripts in this folder.
    let data_home = env_dir("XDG_DATA_HOME")
        .or_else(|| env_dir("HOME").map(|home| home.join(".local").join("share")))?;
    Some(data_home.join("nautilus").join("scripts"))
}

fn env_dir(key: &str) -> Option<PathBuf> {
    let value = std::env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
