use crate::cmd;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Container-wide stream index.
    pub index: u32,
    pub channels: u32,
    pub language: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    /// File name without extension.
    pub display_name: String,
    pub is_directory: bool,
    pub is_regular_file: bool,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<&'static str>,
    pub is_video: bool,
    pub is_image: bool,
    pub duration_seconds: Option<f64>,
    /// Raw rational as reported, e.g. `30000/1001`.
    pub frame_rate: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub audio_streams: Vec<AudioStreamInfo>,
}

impl MediaDescriptor {
    /// Filesystem facts only; no external process involved.
    pub fn from_path(path: &Path) -> Self {
        let metadata = std::fs::metadata(path).ok();
        let is_regular_file = metadata.as_ref().map(|m| m.is_file()).unwrap_or(false);
        Self {
            path: path.to_path_buf(),
            display_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            is_directory: metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false),
            is_regular_file,
            size_bytes: metadata.as_ref().filter(|_| is_regular_file).map(|m| m.len()),
            mime_type: None,
            is_video: false,
            is_image: false,
            duration_seconds: None,
            frame_rate: None,
            width: None,
            height: None,
            audio_streams: Vec::new(),
        }
    }

    pub fn frame_rate_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.frame_rate
            .as_deref()
            .filter(|r| frame_rate_value(r).is_some())
            .unwrap_or(fallback)
    }

    fn apply_video_fields(&mut self, fields: VideoFields) {
        self.is_video = true;
        self.width = Some(fields.width);
        self.height = Some(fields.height);
        self.frame_rate = Some(fields.frame_rate);
        self.duration_seconds = Some(fields.duration_seconds);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoFields {
    pub width: u32,
    pub height: u32,
    pub frame_rate: String,
    pub duration_seconds: f64,
}

/// Builds the descriptor for `path` using the ffprobe at `ffprobe`.
pub fn describe(ffprobe: &Path, path: &Path) -> MediaDescriptor {
    let mut descriptor = MediaDescriptor::from_path(path);
    if !descriptor.is_regular_file {
        return descriptor;
    }

    let mime = guess_mime(path);
    descriptor.mime_type = mime;
    if mime.map(|m| m.starts_with("image/")).unwrap_or(false) {
        descriptor.is_image = true;
        return descriptor;
    }

    // Unknown extensions get probed too; ffprobe knows more containers than we do.
    if mime.map(|m| !m.starts_with("video/")).unwrap_or(false) {
        return descriptor;
    }
    if let Some(fields) = query_video_fields(ffprobe, path) {
        descriptor.apply_video_fields(fields);
    }
    descriptor.audio_streams = query_audio_streams(ffprobe, path).unwrap_or_default();

    tracing::debug!(
        path = %path.display(),
        is_video = descriptor.is_video,
        audio_streams = descriptor.audio_streams.len(),
        "probed"
    );
    descriptor
}

pub fn query_video_fields(ffprobe: &Path, path: &Path) -> Option<VideoFields> {
    let output = cmd::command(ffprobe)
        .args(["-v", "error"])
        .args(["-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height,r_frame_rate,duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .stdin(Stdio::null())
        .output();
    match output {
        Ok(output) => parse_video_fields(&String::from_utf8_lossy(&output.stdout)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "video query failed");
            None
        }
    }
}

pub fn query_audio_streams(ffprobe: &Path, path: &Path) -> Option<Vec<AudioStreamInfo>> {
    let output = cmd::command(ffprobe)
        .args(["-v", "error"])
        .arg("-show_streams")
        .args(["-select_streams", "a"])
        .args(["-of", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(path = %path.display(), code = ?output.status.code(), "audio query failed");
        return None;
    }
    parse_audio_streams(&output.stdout)
}

/// Expects width, height, frame rate and duration, one per line.
pub fn parse_video_fields(stdout: &str) -> Option<VideoFields> {
    let lines: Vec<&str> = stdout.trim().lines().map(str::trim).collect();
    if lines.len() < 4 {
        return None;
    }
    Some(VideoFields {
        width: to_u32_or_zero(lines[0]),
        height: to_u32_or_zero(lines[1]),
        frame_rate: lines[2].to_string(),
        duration_seconds: lines[3].parse::<f64>().ok().filter(|d| d.is_finite()).unwrap_or(0.0),
    })
}

pub fn parse_audio_streams(json: &[u8]) -> Option<Vec<AudioStreamInfo>> {
    let parsed: FfprobeStreams = match serde_json::from_slice(json) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable ffprobe json");
            return None;
        }
    };
    Some(
        parsed
            .streams
            .into_iter()
            .map(|s| {
                let tags = s.tags.unwrap_or_default();
                AudioStreamInfo {
                    index: s.index.unwrap_or(0),
                    channels: s.channels.unwrap_or(2),
                    language: tags.language.filter(|t| !t.trim().is_empty()),
                    title: tags.title.filter(|t| !t.trim().is_empty()),
                }
            })
            .collect(),
    )
}

/// `"30000/1001"` or `"25"` as frames per second.
pub fn frame_rate_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "ts" | "m2ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        _ => return None,
    };
    Some(mime)
}

fn to_u32_or_zero(value: &str) -> u32 {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.trunc() as u32)
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct FfprobeStreams {
    #[serde(default)]
    streams: Vec<FfprobeAudioStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeAudioStream {
    index: Option<u32>,
    channels: Option<u32>,
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_lines_make_a_video() {
        let fields = parse_video_fields("1920\n1080\n30000/1001\n125.4\n").expect("video");
        let mut descriptor = MediaDescriptor::from_path(Path::new("/nonexistent/clip.mkv"));
        descriptor.apply_video_fields(fields);
        assert!(descriptor.is_video);
        assert_eq!(descriptor.width, Some(1920));
        assert_eq!(descriptor.height, Some(1080));
        assert_eq!(descriptor.frame_rate.as_deref(), Some("30000/1001"));
        assert_eq!(descriptor.duration_seconds, Some(125.4));
        assert_eq!(descriptor.display_name, "clip");
    }

    #[test]
    fn fewer_than_four_lines_leave_video_fields_unset() {
        assert_eq!(parse_video_fields("1920\n1080\n30/1\n"), None);
        assert_eq!(parse_video_fields(""), None);

        let descriptor = MediaDescriptor::from_path(Path::new("/nonexistent/clip.mkv"));
        assert!(!descriptor.is_video);
        assert_eq!(descriptor.width, None);
        assert_eq!(descriptor.frame_rate, None);
        assert_eq!(descriptor.duration_seconds, None);
    }

    #[test]
    fn unparsable_numbers_default_to_zero() {
        let fields = parse_video_fields("N/A\r\n720.0\r\n25/1\r\nN/A\r\n").expect("video");
        assert_eq!(fields.width, 0);
        assert_eq!(fields.height, 720);
        assert_eq!(fields.frame_rate, "25/1");
        assert_eq!(fields.duration_seconds, 0.0);
    }

    #[test]
    fn audio_streams_keep_container_order_and_tags() {
        let json = br#"{
  "streams": [
    {"index": 1, "codec_type": "audio", "channels": 2, "tags": {"language": "eng"}},
    {"index": 2, "codec_type": "audio", "channels": 6, "tags": {"language": "jpn", "title": "Japanese 5.1"}},
    {"index": 3, "codec_type": "audio"}
  ]
}"#;
        let streams = parse_audio_streams(json).expect("streams");
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].language.as_deref(), Some("eng"));
        assert_eq!(streams[1].index, 2);
        assert_eq!(streams[1].channels, 6);
        assert_eq!(streams[1].title.as_deref(), Some("Japanese 5.1"));
        assert_eq!(streams[2].channels, 2);
        assert_eq!(streams[2].language, None);
    }

    #[test]
    fn broken_json_is_no_data() {
        assert_eq!(parse_audio_streams(b"{not json"), None);
        assert_eq!(parse_audio_streams(b"{}"), Some(Vec::new()));
    }

    #[test]
    fn frame_rate_parsing() {
        let ntsc = frame_rate_value("30000/1001").expect("ntsc");
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(frame_rate_value("25"), Some(25.0));
        assert_eq!(frame_rate_value("0/0"), None);
        assert_eq!(frame_rate_value("N/A"), None);
    }

    #[test]
    fn image_files_skip_probing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("frame.PNG");
        std::fs::write(&image, b"png").expect("write");
        let descriptor = describe(Path::new("aesimp-test-no-ffprobe-4711"), &image);
        assert!(descriptor.is_image);
        assert!(!descriptor.is_video);
        assert_eq!(descriptor.mime_type, Some("image/png"));
        assert_eq!(descriptor.size_bytes, Some(3));
    }

    #[test]
    fn missing_prober_degrades_to_plain_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").expect("write");
        let descriptor = describe(Path::new("aesimp-test-no-ffprobe-4711"), &video);
        assert!(descriptor.is_regular_file);
        assert!(!descriptor.is_video);
        assert!(descriptor.audio_streams.is_empty());
    }

    #[test]
    fn directories_are_not_probed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = describe(Path::new("aesimp-test-no-ffprobe-4711"), dir.path());
        assert!(descriptor.is_directory);
        assert!(!descriptor.is_regular_file);
        assert_eq!(descriptor.size_bytes, None);
    }
}
