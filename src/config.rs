use crate::paths::AppPaths;
use crate::{Result, ToolkitError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "https://aesimp.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitSettings {
    /// Origin that serves tool archives under `/aesimp-tools/application/`.
    pub server_url: String,
    /// Check that a cached tool path still exists before returning it.
    pub verify_cached_paths: bool,
    pub http_timeout_secs: u64,
    /// Overrides the platform "send to" folder for launchers.
    pub send_to_dir: Option<PathBuf>,
}

impl Default for ToolkitSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            verify_cached_paths: true,
            http_timeout_secs: 300,
            send_to_dir: None,
        }
    }
}

pub fn load_settings(paths: &AppPaths) -> Result<ToolkitSettings> {
    let path = paths.settings_path();
    if !path.exists() {
        return Ok(ToolkitSettings::default());
    }
    let bytes = std::fs::read(&path)?;
    let parsed: ToolkitSettings = serde_json::from_slice(&bytes).map_err(|e| {
        ToolkitError::InvalidInput(format!(
            "failed to parse settings at {}: {e}",
            path.to_string_lossy()
        ))
    })?;
    validate_server_url(&parsed.server_url)?;
    Ok(parsed)
}

pub fn save_settings(paths: &AppPaths, settings: &ToolkitSettings) -> Result<()> {
    validate_server_url(&settings.server_url)?;
    let path = paths.settings_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(())
}

fn validate_server_url(value: &str) -> Result<()> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|e| ToolkitError::InvalidInput(format!("invalid server_url {value}: {e}")))?;
    if parsed.scheme() != "https" {
        return Err(ToolkitError::InvalidInput(format!(
            "server_url must use https: {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let settings = load_settings(&paths).expect("load");
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert!(settings.verify_cached_paths);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        std::fs::create_dir_all(paths.config_dir()).expect("config dir");
        std::fs::write(paths.settings_path(), r#"{"verify_cached_paths": false}"#)
            .expect("write settings");

        let settings = load_settings(&paths).expect("load");
        assert!(!settings.verify_cached_paths);
        assert_eq!(settings.http_timeout_secs, 300);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let settings = ToolkitSettings {
            server_url: "https://mirror.example.org".to_string(),
            send_to_dir: Some(PathBuf::from("/tmp/launchers")),
            ..ToolkitSettings::default()
        };
        save_settings(&paths, &settings).expect("save");

        let loaded = load_settings(&paths).expect("load");
        assert_eq!(loaded.server_url, "https://mirror.example.org");
        assert_eq!(loaded.send_to_dir, Some(PathBuf::from("/tmp/launchers")));
    }

    #[test]
    fn plain_http_server_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let settings = ToolkitSettings {
            server_url: "http://aesimp.com".to_string(),
            ..ToolkitSettings::default()
        };
        assert!(save_settings(&paths, &settings).is_err());
    }
}
