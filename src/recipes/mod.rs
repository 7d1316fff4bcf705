pub mod audio;
mod converter;
mod interpolate;
mod upscale;
mod video;

use crate::cmd::Invocation;
use crate::toolkit::Toolkit;
use crate::{Result, ToolkitError};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

pub use converter::Converter;
pub use interpolate::Interpolate;
pub use upscale::Upscale;
pub use video::{Compress, Decompose, Downscale, Remux, RipAudio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Converter,
    Upscale,
    Interpolate,
    Remux,
    Decompose,
    RipAudio,
    Compress,
    Downscale,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::Converter,
        Mode::Upscale,
        Mode::Interpolate,
        Mode::Remux,
        Mode::Decompose,
        Mode::RipAudio,
        Mode::Compress,
        Mode::Downscale,
    ];

    /// Name used on the command line and in launcher file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Converter => "converter",
            Mode::Upscale => "upscale",
            Mode::Interpolate => "interpolate",
            Mode::Remux => "remux",
            Mode::Decompose => "decompose",
            Mode::RipAudio => "ripAudio",
            Mode::Compress => "compress",
            Mode::Downscale => "downscale",
        }
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| mode.as_str() == name)
    }

    pub fn recipe(&self) -> &'static dyn Recipe {
        match self {
            Mode::Converter => &Converter,
            Mode::Upscale => &Upscale,
            Mode::Interpolate => &Interpolate,
            Mode::Remux => &Remux,
            Mode::Decompose => &Decompose,
            Mode::RipAudio => &RipAudio,
            Mode::Compress => &Compress,
            Mode::Downscale => &Downscale,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Recipe {
    /// Resolves the tools the recipe needs, then processes `files` in order.
    /// An `Err` means the batch could not start at all (e.g. a missing tool).
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport>;
}

/// Runs `mode` over `files`.
pub fn run(kit: &Toolkit, mode: Mode, files: &[PathBuf]) -> Result<BatchReport> {
    tracing::info!(mode = %mode, files = files.len(), "recipe start");
    let report = mode.recipe().run(kit, files)?;
    tracing::info!(
        mode = %mode,
        processed = report.processed.len(),
        failed = report.failures.len(),
        "recipe done"
    );
    Ok(report)
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, ToolkitError)>,
    pub cleanup_warnings: Vec<ToolkitError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.cleanup_warnings.is_empty()
    }

    /// Records a workspace that could not be removed.
    pub fn note_cleanup(&mut self, cleanup: Result<()>) {
        if let Err(e) = cleanup {
            eprintln!("\nFolder not deleted! {e}");
            self.cleanup_warnings.push(e);
        }
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} processed, {} failed",
            self.processed.len(),
            self.failures.len()
        );
        if !self.cleanup_warnings.is_empty() {
            line.push_str(&format!(
                ", {} working folder(s) left behind",
                self.cleanup_warnings.len()
            ));
        }
        line
    }
}

/// Calls `job` for each file, printing a header per file and collecting
/// failures instead of stopping.
pub(crate) fn for_each_file(
    files: &[PathBuf],
    mut job: impl FnMut(&Path, &mut BatchReport) -> Result<()>,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = files.len();
    for (i, file) in files.iter().enumerate() {
        println!("[{}/{total}] {}", i + 1, file.display());
        match job(file, &mut report) {
            Ok(()) => report.processed.push(file.clone()),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "file failed");
                eprintln!("{}: {e}", file.display());
                report.failures.push((file.clone(), e));
            }
        }
    }
    report
}

/// `<parent>/<stem>-<suffix>.<ext>` next to `input`.
pub(crate) fn sibling_output(input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    parent_dir(input).join(format!("{stem}-{suffix}.{ext}"))
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// `ffmpeg -nostdin -y -i <input>`, ready for output options.
pub(crate) fn ffmpeg_input(ffmpeg: &Path, input: impl AsRef<OsStr>, label: &str) -> Invocation {
    Invocation::new(ffmpeg, label)
        .args(["-nostdin", "-y", "-i"])
        .arg(input)
}

/// ffmpeg image-sequence pattern for numbered PNG frames in `dir`.
pub(crate) fn frame_pattern(dir: &Path) -> OsString {
    dir.join("%08d.png").into_os_string()
}

/// Last run of digits in the file stem, used to order generated frames.
pub fn trailing_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let end = stem.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = stem[..end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    stem[start..end].parse().ok()
}

pub(crate) fn require_video(desc: &crate::probe::MediaDescriptor) -> Result<()> {
    if desc.is_video {
        Ok(())
    } else {
        Err(ToolkitError::InvalidInput(format!(
            "File must be a video: {}",
            desc.path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_name(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::from_name("ripAudio"), Some(Mode::RipAudio));
        assert_eq!(Mode::from_name("ripaudio"), None);
        assert_eq!(Mode::from_name("install"), None);
    }

    #[test]
    fn sibling_output_keeps_parent_and_stem() {
        let out = sibling_output(Path::new("/videos/show.ep1.mkv"), "remux", "mp4");
        assert_eq!(out, PathBuf::from("/videos/show.ep1-remux.mp4"));
        let bare = sibling_output(Path::new("clip.mov"), "upload", "mp4");
        assert_eq!(bare, PathBuf::from("./clip-upload.mp4"));
    }

    #[test]
    fn trailing_number_takes_last_digit_run() {
        assert_eq!(trailing_number(Path::new("00000123.png")), Some(123));
        assert_eq!(trailing_number(Path::new("frame2_0042.png")), Some(42));
        assert_eq!(trailing_number(Path::new("cover.png")), None);
    }

    #[test]
    fn for_each_file_continues_after_failure() {
        let files = vec![
            PathBuf::from("a.mkv"),
            PathBuf::from("b.mkv"),
            PathBuf::from("c.mkv"),
        ];
        let report = for_each_file(&files, |file, _| {
            if file == Path::new("b.mkv") {
                Err(ToolkitError::InvalidInput("broken".to_string()))
            } else {
                Ok(())
            }
        });
        assert_eq!(report.processed, vec![PathBuf::from("a.mkv"), PathBuf::from("c.mkv")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, PathBuf::from("b.mkv"));
        assert_eq!(report.summary(), "2 processed, 1 failed");
        assert!(!report.is_clean());
    }
}
