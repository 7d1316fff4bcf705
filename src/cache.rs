use std::path::PathBuf;

const CACHE_SUFFIX: &str = "cache";

/// `<cache_dir>/<name>.cache`, one path per file. Failures are logged, never raised.
#[derive(Debug, Clone)]
pub struct PathCache {
    dir: PathBuf,
}

impl PathCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{CACHE_SUFFIX}"))
    }

    /// Stored value for `name`; `None` when absent, blank or unreadable.
    pub fn get(&self, name: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.record_path(name)).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    /// Overwrites the record for `name`. Blank values never clear an entry.
    pub fn put(&self, name: &str, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        let path = self.record_path(name);
        let written = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, value));
        if let Err(e) = written {
            tracing::debug!(name, path = %path.display(), error = %e, "cache write skipped");
        }
    }

    pub fn delete(&self, name: &str) {
        let path = self.record_path(name);
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(name, path = %path.display(), error = %e, "cache delete failed");
            }
        }
    }

    /// Removes every record; returns how many were deleted.
    pub fn clear(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0_usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_record = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == CACHE_SUFFIX)
                .unwrap_or(false);
            if is_record && path.is_file() && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_in(dir: &tempfile::TempDir) -> PathCache {
        PathCache::new(dir.path().join("cache"))
    }

    #[test]
    fn get_on_never_written_name_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(cache_in(&dir).get("ffmpeg"), None);
    }

    #[test]
    fn put_trims_and_get_returns_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.put("ffmpeg", Some("  /opt/ffmpeg/bin/ffmpeg \n"));
        assert_eq!(cache.get("ffmpeg").as_deref(), Some("/opt/ffmpeg/bin/ffmpeg"));

        let raw = std::fs::read_to_string(dir.path().join("cache").join("ffmpeg.cache"))
            .expect("read record");
        assert_eq!(raw, "/opt/ffmpeg/bin/ffmpeg");
    }

    #[test]
    fn blank_or_missing_put_keeps_existing_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.put("cugan", Some("/tools/cugan"));
        cache.put("cugan", Some("   "));
        cache.put("cugan", None);
        assert_eq!(cache.get("cugan").as_deref(), Some("/tools/cugan"));
    }

    #[test]
    fn whitespace_only_record_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.dir()).expect("cache dir");
        std::fs::write(cache.dir().join("ffprobe.cache"), " \n\t").expect("write");
        assert_eq!(cache.get("ffprobe"), None);
    }

    #[test]
    fn delete_removes_record_and_tolerates_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.put("ffmpeg", Some("/bin/ffmpeg"));
        cache.delete("ffmpeg");
        assert_eq!(cache.get("ffmpeg"), None);
        cache.delete("ffmpeg");
    }

    #[test]
    fn deleted_cache_dir_is_recreated_on_put() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.put("a", Some("/x"));
        std::fs::remove_dir_all(cache.dir()).expect("remove cache dir");
        assert_eq!(cache.get("a"), None);
        cache.put("a", Some("/y"));
        assert_eq!(cache.get("a").as_deref(), Some("/y"));
    }

    #[test]
    fn clear_removes_only_cache_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.put("a", Some("/x"));
        cache.put("b", Some("/y"));
        std::fs::write(cache.dir().join("notes.txt"), "keep").expect("write");

        assert_eq!(cache.clear(), 2);
        assert!(cache.dir().join("notes.txt").exists());
        assert_eq!(cache.get("a"), None);
    }
}
