use crate::probe::AudioStreamInfo;

const JAPANESE_MARKERS: [&str; 3] = ["jpn", "japan", "japanese"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPlan {
    /// No audio streams were reported.
    FirstTrack,
    /// Stream copy of the audio track at `position` among audio streams.
    Copy { position: usize },
    /// Front-centre channel of the track at `position`, as mono AAC.
    FrontCenter { position: usize },
}

/// Last track by default; the first Japanese-tagged track overrides it.
pub fn select_audio(streams: &[AudioStreamInfo]) -> AudioPlan {
    let Some(last) = streams.len().checked_sub(1) else {
        return AudioPlan::FirstTrack;
    };
    let position = streams
        .iter()
        .position(is_japanese)
        .unwrap_or(last);
    if streams[position].channels > 2 {
        AudioPlan::FrontCenter { position }
    } else {
        AudioPlan::Copy { position }
    }
}

fn is_japanese(stream: &AudioStreamInfo) -> bool {
    [&stream.language, &stream.title]
        .into_iter()
        .flatten()
        .map(|tag| tag.to_ascii_lowercase())
        .any(|tag| JAPANESE_MARKERS.iter().any(|m| tag.contains(m)))
}

impl AudioPlan {
    /// ffmpeg arguments that follow `-map 0:v:0`.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        match self {
            AudioPlan::FirstTrack => vec!["-map".into(), "0:a:0?".into(), "-c".into(), "copy".into()],
            AudioPlan::Copy { position } => vec![
                "-map".into(),
                format!("0:a:{position}"),
                "-c".into(),
                "copy".into(),
            ],
            AudioPlan::FrontCenter { position } => vec![
                "-filter_complex".into(),
                format!("[0:a:{position}]pan=mono|c0=FC[a]"),
                "-map".into(),
                "[a]".into(),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "aac".into(),
            ],
        }
    }
}
