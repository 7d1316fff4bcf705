use super::video::{decompose_invocation, h264_video};
use super::{for_each_file, frame_pattern, sibling_output, trailing_number, BatchReport, Recipe};
use crate::cmd::Invocation;
use crate::toolkit::Toolkit;
use crate::tools::ToolSpec;
use crate::workspace::FrameWorkspace;
use crate::{Result, ToolkitError};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

const FACTOR_MIN: u32 = 2;
const FACTOR_MAX: u32 = 16;
const FACTOR_DEFAULT: u32 = 8;
const FACTOR_INFO: &str = "The quality can decrease by higher value";
const OUTPUT_FPS: &str = "60";
const ENCODE_CRF: u32 = 15;

/// Frame interpolation with RIFE. Accepts a video or a folder of frames.
pub struct Interpolate;

impl Recipe for Interpolate {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        let rife = kit.require_tool(&ToolSpec::RIFE)?;
        let factor = kit.ask_number(FACTOR_MIN, FACTOR_MAX, FACTOR_DEFAULT, Some(FACTOR_INFO));

        Ok(for_each_file(files, |file, report| {
            let desc = kit.probe(file)?;
            let target = sibling_output(file, "flowframe", "mov");
            if desc.is_video {
                let (result, cleanup) = FrameWorkspace::scoped(file, |ws| -> Result<()> {
                    let frames = ws.subdir("frames")?;
                    kit.run(&decompose_invocation(&ffmpeg, file, &frames, "decompose"))?;
                    let out = ws.subdir("interpolate")?;
                    interpolate_frames(kit, &rife, &frames, &out, factor)?;
                    kit.run(&encode_invocation(&ffmpeg, &out, &target))
                })?;
                report.note_cleanup(cleanup);
                result
            } else if desc.is_directory {
                let out = file.join("interpolate");
                std::fs::create_dir_all(&out)?;
                interpolate_frames(kit, &rife, file, &out, factor)?;
                kit.run(&encode_invocation(&ffmpeg, &out, &target))
            } else if desc.is_regular_file {
                Err(ToolkitError::InvalidInput(
                    "Please select a video or folder".to_string(),
                ))
            } else {
                Err(ToolkitError::InvalidInput(format!(
                    "not found: {}",
                    file.display()
                )))
            }
        }))
    }
}

fn interpolate_frames(
    kit: &Toolkit,
    rife: &Path,
    frames: &Path,
    out: &Path,
    factor: u32,
) -> Result<()> {
    let count = png_frames(frames)?.len();
    if count == 0 {
        return Err(ToolkitError::InvalidInput(format!(
            "no .png frames in {}",
            frames.display()
        )));
    }
    let target_frames = count * factor as usize;
    kit.run(&rife_invocation(rife, frames, out, target_frames))?;

    // The last factor-1 frames interpolate past the final source frame.
    let removed = drop_last_frames(out, factor.saturating_sub(1) as usize)?;
    tracing::debug!(count, target_frames, removed, "frames interpolated");
    Ok(())
}

pub fn rife_invocation(
    rife: &Path,
    input: &Path,
    output: &Path,
    target_frames: usize,
) -> Invocation {
    let mut inv = Invocation::new(rife, "interpolate")
        .arg("-i")
        .arg(input)
        .arg("-n")
        .arg(target_frames.to_string())
        .arg("-o")
        .arg(output);
    if let Some(dir) = rife.parent().filter(|p| !p.as_os_str().is_empty()) {
        inv = inv.current_dir(dir);
    }
    inv
}

fn encode_invocation(ffmpeg: &Path, frames: &Path, target: &Path) -> Invocation {
    let inv = Invocation::new(ffmpeg, "encode")
        .args(["-nostdin", "-y", "-framerate", OUTPUT_FPS, "-i"])
        .arg(frame_pattern(frames));
    h264_video(inv, ENCODE_CRF).arg(target)
}

/// `.png` files directly inside `dir`.
pub fn png_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            frames.push(path);
        }
    }
    Ok(frames)
}

/// Deletes the `n` highest-numbered frames in `dir`.
pub fn drop_last_frames(dir: &Path, n: usize) -> std::io::Result<usize> {
    let mut frames = png_frames(dir)?;
    frames.sort_by_key(|p| Reverse(trailing_number(p)));
    let mut removed = 0;
    for frame in frames.iter().take(n) {
        std::fs::remove_file(frame)?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"png").expect("write frame");
    }

    #[test]
    fn png_frames_ignores_other_files_and_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "00000001.png");
        touch(dir.path(), "00000002.PNG");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("interpolate.png")).expect("mkdir");
        assert_eq!(png_frames(dir.path()).expect("list").len(), 2);
    }

    #[test]
    fn drop_last_frames_removes_highest_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 1..=10 {
            touch(dir.path(), &format!("{i:08}.png"));
        }
        assert_eq!(drop_last_frames(dir.path(), 3).expect("drop"), 3);

        let mut left: Vec<u64> = png_frames(dir.path())
            .expect("list")
            .iter()
            .filter_map(|p| trailing_number(p))
            .collect();
        left.sort_unstable();
        assert_eq!(left, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn rife_target_count_and_working_dir() {
        let inv = rife_invocation(
            Path::new("/deps/rife-ncnn-vulkan/rife-ncnn-vulkan"),
            Path::new("/tmp/frames"),
            Path::new("/tmp/out"),
            80,
        );
        let args: Vec<String> = inv
            .args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["-i", "/tmp/frames", "-n", "80", "-o", "/tmp/out"]);
        assert_eq!(
            inv.current_dir.as_deref(),
            Some(Path::new("/deps/rife-ncnn-vulkan"))
        );
    }

    #[test]
    fn encode_runs_at_sixty_fps() {
        let inv = encode_invocation(
            Path::new("ffmpeg"),
            Path::new("/tmp/out"),
            Path::new("/v/ep-flowframe.mov"),
        );
        let args: Vec<String> = inv
            .args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-framerate", "60"]));
        assert_eq!(args.last().map(String::as_str), Some("/v/ep-flowframe.mov"));
    }
}
