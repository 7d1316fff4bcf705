use super::video::{h264_encode, CRF_DEFAULT};
use super::{ffmpeg_input, for_each_file, sibling_output, BatchReport, Recipe};
use crate::cmd::Invocation;
use crate::probe::{frame_rate_value, MediaDescriptor};
use crate::toolkit::Toolkit;
use crate::tools::ToolSpec;
use crate::Result;
use std::path::{Path, PathBuf};

const MAX_SHORT_SIDE: u32 = 1080;
const MAX_FRAME_RATE: f64 = 60.0;

/// Upload-friendly MP4: H.264/AAC, faststart, at most 1080p60.
pub struct Converter;

impl Recipe for Converter {
    fn run(&self, kit: &Toolkit, files: &[PathBuf]) -> Result<BatchReport> {
        let ffmpeg = kit.require_tool(&ToolSpec::FFMPEG)?;
        Ok(for_each_file(files, |file, _| {
            let desc = kit.probe(file)?;
            kit.run(&converter_invocation(&ffmpeg, file, &desc))
        }))
    }
}

pub fn converter_invocation(ffmpeg: &Path, input: &Path, desc: &MediaDescriptor) -> Invocation {
    let mut inv = h264_encode(ffmpeg_input(ffmpeg, input, "converter"), CRF_DEFAULT);
    if let Some(filter) = scale_filter(desc.width, desc.height) {
        inv = inv.args(["-vf", filter]);
    }
    let too_fast = desc
        .frame_rate
        .as_deref()
        .and_then(frame_rate_value)
        .is_some_and(|fps| fps > MAX_FRAME_RATE);
    if too_fast {
        inv = inv.args(["-r", "60"]);
    }
    inv.args(["-movflags", "+faststart"])
        .arg(sibling_output(input, "upload", "mp4"))
}

/// Scales the short side down to 1080 when the source is larger.
fn scale_filter(width: Option<u32>, height: Option<u32>) -> Option<&'static str> {
    let (width, height) = (width?, height?);
    if width.min(height) <= MAX_SHORT_SIDE {
        return None;
    }
    Some(if width >= height {
        "scale=-2:1080"
    } else {
        "scale=1080:-2"
    })
}
