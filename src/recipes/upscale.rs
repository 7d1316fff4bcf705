use super::video::{decompose_invocation, h264_video, AAC_AUDIO};
use super::{for_each_file, frame_pattern, parent_dir, sibling_output, BatchReport, Recipe};
use crate::cmd::Invocation;
use crate::probe::MediaDescriptor;
use crate::toolkit::Toolkit;
use crate::tools::ToolSpec;
use crate::workspace::FrameWorkspace;
use crate::{Result, ToolkitError};
use std::path::{Path, PathBuf};

const ENCODE_CRF: u32 = 15;

/// 2x upscale with Real-CUGAN. Accepts a video, a single image or a folder
/// of images.
pub struct Upscale;

impl Recipe for Upscale {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        let cugan = kit.require_tool(&ToolSpec::CUGAN)?;
        Ok(for_each_file(files, |file, report| {
            let desc = kit.probe(file)?;
            if desc.is_video {
                let (result, cleanup) = FrameWorkspace::scoped(file, |ws| -> Result<()> {
                    let frames = ws.subdir("frames")?;
                    kit.run(&decompose_invocation(&ffmpeg, file, &frames, "decompose"))?;
                    let upscaled = ws.subdir("upscaled")?;
                    kit.run(&cugan_invocation(&cugan, &frames, &upscaled))?;
                    kit.run(&encode_invocation(&ffmpeg, &upscaled, &desc))
                })?;
                report.note_cleanup(cleanup);
                result
            } else if desc.is_image {
                let out = image_output(file)?;
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                kit.run(&cugan_invocation(&cugan, file, &out))
            } else if desc.is_directory {
                let out = file.join("upscaled");
                std::fs::create_dir_all(&out)?;
                kit.run(&cugan_invocation(&cugan, file, &out))
            } else if desc.is_regular_file {
                Err(ToolkitError::InvalidInput(format!(
                    "Please select a video, image or folder: {}",
                    file.display()
                )))
            } else {
                Err(ToolkitError::InvalidInput(format!(
                    "not found: {}",
                    file.display()
                )))
            }
        }))
    }
}

/// The engine loads its models relative to its own folder.
pub fn cugan_invocation(cugan: &Path, input: &Path, output: &Path) -> Invocation {
    let mut inv = Invocation::new(cugan, "upscale")
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .args(["-s", "2", "-n", "3", "-m", "models-pro"]);
    if let Some(dir) = cugan.parent().filter(|p| !p.as_os_str().is_empty()) {
        inv = inv.current_dir(dir);
    }
    inv
}

/// `<parent>/upscaled/<name>`
fn image_output(image: &Path) -> Result<PathBuf> {
    let name = image.file_name().ok_or_else(|| {
        ToolkitError::InvalidInput(format!("not a file name: {}", image.display()))
    })?;
    Ok(parent_dir(image).join("upscaled").join(name))
}

/// Upscaled frames at the source frame rate, muxed with the source audio.
fn encode_invocation(ffmpeg: &Path, frames: &Path, source: &MediaDescriptor) -> Invocation {
    let inv = Invocation::new(ffmpeg, "encode")
        .args(["-nostdin", "-y", "-framerate", source.frame_rate_or("60"), "-i"])
        .arg(frame_pattern(frames))
        .arg("-i")
        .arg(&source.path)
        .args(["-map", "0:v:0", "-map", "1:a?"]);
    h264_video(inv, ENCODE_CRF)
        .args(AAC_AUDIO)
        .arg("-shortest")
        .arg(sibling_output(&source.path, "upscaled", "mov"))
}
