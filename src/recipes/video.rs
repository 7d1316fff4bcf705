use super::audio::select_audio;
use super::{
    ffmpeg_input, for_each_file, frame_pattern, parent_dir, require_video, sibling_output,
    BatchReport, Recipe,
};
use crate::cmd::Invocation;
use crate::probe::AudioStreamInfo;
use crate::toolkit::Toolkit;
use crate::tools::ToolSpec;
use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};

const CRF_MIN: u32 = 1;
const CRF_MAX: u32 = 51;
pub(crate) const CRF_DEFAULT: u32 = 15;
pub(crate) const AAC_AUDIO: [&str; 4] = ["-c:a", "aac", "-b:a", "192k"];
const CRF_INFO: &str = "Lower is better quality but larger filesize";

const SCALE_MIN: u32 = 360;
const SCALE_MAX: u32 = 2160;

/// Copies video plus one chosen audio track into MP4.
pub struct Remux;
/// Extracts every frame as a numbered PNG.
pub struct Decompose;
/// Audio only, as VBR MP3.
pub struct RipAudio;
/// Re-encodes at a user-chosen CRF.
pub struct Compress;
/// Re-encodes at a user-chosen CRF and short-side size.
pub struct Downscale;

impl Recipe for Remux {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            require_video(&desc)?;
            let (primary, fallback) = remux_invocations(&ffmpeg, file, &desc.audio_streams);
            kit.run_with_fallback(&primary, &fallback)
        }))
    }
}

impl Recipe for Decompose {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            require_video(&desc)?;
            let out_dir = decompose_dir(file);
            std::fs::create_dir_all(&out_dir)?;
            kit.run(&decompose_invocation(&ffmpeg, file, &out_dir, "decompose"))
        }))
    }
}

impl Recipe for RipAudio {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            require_video(&desc)?;
            kit.run(&rip_audio_invocation(&ffmpeg, file))
        }))
    }
}

impl Recipe for Compress {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            require_video(&desc)?;
            let crf = kit.ask_number(CRF_MIN, CRF_MAX, CRF_DEFAULT, Some(CRF_INFO));
            kit.run(&compress_invocation(&ffmpeg, file, crf))
        }))
    }
}

impl Recipe for Downscale {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            require_video(&desc)?;
            let (width, height) = match (desc.width, desc.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
                _ => {
                    return Err(ToolkitError::InvalidInput(format!(
                        "video size unknown: {}",
                        file.display()
                    )))
                }
            };

            let crf = kit.ask_number(CRF_MIN, CRF_MAX, CRF_DEFAULT, Some(CRF_INFO));
            let (side, original) = if width < height {
                ("width", width)
            } else {
                ("height", height)
            };
            let info = format!("Please enter the target size for <{side}> (original: {original})");
            let target = kit.ask_number(
                SCALE_MIN,
                SCALE_MAX,
                original.clamp(SCALE_MIN, SCALE_MAX),
                Some(&info),
            );
            let size = downscale_size(width, height, target);
            kit.run(&downscale_invocation(&ffmpeg, file, crf, size))
        }))
    }
}

/// Primary: video plus the heuristic's audio track, no re-encode.
/// Fallback: full re-encode with ffmpeg's default stream selection.
pub fn remux_invocations(
    ffmpeg: &Path,
    input: &Path,
    audio_streams: &[AudioStreamInfo],
) -> (Invocation, Invocation) {
    let output = sibling_output(input, "remux", "mp4");
    let primary = ffmpeg_input(ffmpeg, input, "remux")
        .args(["-map", "0:v:0"])
        .args(select_audio(audio_streams).ffmpeg_args())
        .arg(&output);
    let fallback = h264_encode(ffmpeg_input(ffmpeg, input, "remux (re-encode)"), CRF_DEFAULT)
        .arg(&output);
    (primary, fallback)
}

/// `<parent>/<stem>/`
pub fn decompose_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    parent_dir(input).join(stem)
}

pub fn decompose_invocation(
    ffmpeg: &Path,
    input: &Path,
    out_dir: &Path,
    label: &str,
) -> Invocation {
    ffmpeg_input(ffmpeg, input, label).arg(frame_pattern(out_dir))
}

pub fn rip_audio_invocation(ffmpeg: &Path, input: &Path) -> Invocation {
    ffmpeg_input(ffmpeg, input, "ripAudio")
        .args(["-q:a", "0", "-map", "a"])
        .arg(sibling_output(input, "ripAudio", "mp3"))
}

pub fn compress_invocation(ffmpeg: &Path, input: &Path, crf: u32) -> Invocation {
    h264_encode(ffmpeg_input(ffmpeg, input, "compress"), crf)
        .arg(sibling_output(input, "compress", "mp4"))
}

pub fn downscale_invocation(
    ffmpeg: &Path,
    input: &Path,
    crf: u32,
    size: (u32, u32),
) -> Invocation {
    let (width, height) = size;
    h264_encode(ffmpeg_input(ffmpeg, input, "downscale"), crf)
        .args(["-vf", &format!("scale={width}:{height}")])
        .arg(sibling_output(input, "downscale", "mp4"))
}

/// Sets the short side to `target` and scales the other side to keep the
/// aspect ratio. Both sides end up even, as H.264 with 4:2:0 requires.
pub fn downscale_size(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scaled = |long: u32, short: u32| {
        (f64::from(long) / f64::from(short) * f64::from(target)).round() as u32
    };
    let (w, h) = if width < height {
        (target, scaled(height, width))
    } else {
        (scaled(width, height), target)
    };
    (even(w), even(h))
}

fn even(value: u32) -> u32 {
    (value - value % 2).max(2)
}

/// H.264 video plus AAC audio.
pub(crate) fn h264_encode(invocation: Invocation, crf: u32) -> Invocation {
    h264_video(invocation, crf).args(AAC_AUDIO)
}

pub(crate) fn h264_video(invocation: Invocation, crf: u32) -> Invocation {
    invocation
        .args(["-c:v", "libx264", "-preset", "slow", "-crf"])
        .arg(crf.to_string())
        .args(["-pix_fmt", "yuv420p"])
}
