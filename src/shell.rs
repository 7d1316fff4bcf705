use crate::paths::AppPaths;
use crate::prompt::Prompt;
use crate::recipes::Mode;
use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};

const LAUNCHER_PREFIX: &str = "aesimp ";

#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed_exe: PathBuf,
    pub removed_launchers: usize,
    pub launchers: Vec<PathBuf>,
}

/// Installs the running executable and asks which launchers to create.
pub fn install(paths: &AppPaths, prompt: &dyn Prompt) -> Result<InstallReport> {
    let current = std::env::current_exe()?;
    install_from(paths, prompt, &current)
}

pub fn install_from(paths: &AppPaths, prompt: &dyn Prompt, exe: &Path) -> Result<InstallReport> {
    paths.ensure_dirs()?;
    let installed_exe = paths.installed_exe_path();
    if !same_file(exe, &installed_exe) {
        println!("Copy exe to target folder...");
        std::fs::copy(exe, &installed_exe)?;
        println!("Installed to {}", paths.base_dir.display());
    }

    let send_to = send_to_dir(paths)?;
    std::fs::create_dir_all(&send_to)?;
    println!("Create SendTo links...");
    let removed_launchers = remove_launchers(&send_to)?;

    let names: Vec<&str> = Mode::ALL.iter().map(|m| m.as_str()).collect();
    let chosen = prompt.choose_many("Which tools will you use?", &names);

    let mut launchers = Vec::new();
    for name in chosen {
        let Some(mode) = Mode::from_name(&name) else {
            tracing::warn!(name = %name, "ignoring unknown launcher choice");
            continue;
        };
        let launcher = write_launcher(&send_to, &installed_exe, &paths.base_dir, mode)?;
        println!("    Created shortcut for <{mode}>");
        launchers.push(launcher);
    }
    tracing::info!(
        dir = %send_to.display(),
        created = launchers.len(),
        removed = removed_launchers,
        "launchers installed"
    );

    Ok(InstallReport {
        installed_exe,
        removed_launchers,
        launchers,
    })
}

/// Removes every launcher; the installed binary and tools stay.
pub fn uninstall(paths: &AppPaths) -> Result<usize> {
    let send_to = send_to_dir(paths)?;
    if !send_to.is_dir() {
        return Ok(0);
    }
    let removed = remove_launchers(&send_to)?;
    tracing::info!(dir = %send_to.display(), removed, "launchers removed");
    Ok(removed)
}

fn send_to_dir(paths: &AppPaths) -> Result<PathBuf> {
    paths.send_to_dir().ok_or_else(|| {
        ToolkitError::InvalidInput(
            "no launcher folder known for this system; set send_to_dir in settings.json"
                .to_string(),
        )
    })
}

pub fn launcher_file_name(mode: Mode) -> String {
    if cfg!(windows) {
        format!("{LAUNCHER_PREFIX}{mode}.cmd")
    } else {
        format!("{LAUNCHER_PREFIX}{mode}")
    }
}

/// Script body that runs `exe` in `mode` on whatever the file manager passes.
pub fn launcher_contents(exe: &Path, base_dir: &Path, mode: Mode) -> String {
    if cfg!(windows) {
        format!(
            "@echo off\r\n\"{}\" --base-dir \"{}\" {mode} %*\r\n",
            exe.display(),
            base_dir.display()
        )
    } else {
        format!(
            "#!/bin/sh\nexec \"{}\" --base-dir \"{}\" {mode} \"$@\"\n",
            exe.display(),
            base_dir.display()
        )
    }
}

fn write_launcher(dir: &Path, exe: &Path, base_dir: &Path, mode: Mode) -> Result<PathBuf> {
    let path = dir.join(launcher_file_name(mode));
    std::fs::write(&path, launcher_contents(exe, base_dir, mode))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(path)
}

/// Deletes files named `aesimp <...>` directly inside `dir`.
fn remove_launchers(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_launcher = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LAUNCHER_PREFIX));
        if is_launcher && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
