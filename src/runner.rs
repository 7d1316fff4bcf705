use crate::cmd::Invocation;
use crate::{Result, ToolkitError};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

const STDERR_TAIL_LINES: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    show_progress: bool,
}

impl ProcessRunner {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Blocks until the child exits. Non-zero exit is `ProcessFailed`.
    pub fn run(&self, invocation: &Invocation) -> Result<()> {
        let label = invocation.label.as_str();
        tracing::debug!(label, shell = invocation.uses_shell(), command = %invocation.display_line(), "spawning");

        let mut child = invocation
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ToolkitError::tool_not_found(invocation.program_name())
                }
                _ => ToolkitError::Io(e),
            })?;

        let bar = self.status_line();
        bar.set_message(label.to_string());

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            let read = for_each_line(BufReader::new(stderr), |line| {
                match frame_counter(line) {
                    Some(frame) => bar.set_message(status_text(label, Some(frame))),
                    None => {
                        bar.set_message(status_text(label, None));
                        tracing::trace!(label, line, "stderr");
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line.to_string());
                    }
                }
            });
            if let Err(e) = read {
                tracing::warn!(label, error = %e, "stopped reading stderr");
            }
        }

        let status = child.wait()?;
        if !status.success() {
            bar.finish_and_clear();
            tracing::debug!(label, code = ?status.code(), "process failed");
            return Err(ToolkitError::ProcessFailed {
                label: label.to_string(),
                code: status.code(),
                stderr_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }

        let done = format!("{label} finished");
        if self.show_progress && bar.is_hidden() {
            println!("{done}");
        }
        bar.finish_with_message(done);
        Ok(())
    }

    fn status_line(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

/// Integer part of the first `frame = <number>` in `line`.
pub fn frame_counter(line: &str) -> Option<u64> {
    static FRAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = FRAME_RE.get_or_init(|| {
        Regex::new(r"\bframe\s*=\s*(\d+)(?:\.\d+)?").expect("frame counter regex")
    });
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

pub fn status_text(label: &str, frame: Option<u64>) -> String {
    match frame {
        Some(frame) => format!("{label} frame: {frame}"),
        None => label.to_string(),
    }
}

/// Calls `on_line` for every non-empty line, treating `\r` as a terminator
/// too: encoders redraw their stats line with bare carriage returns.
fn for_each_line<R: BufRead>(mut reader: R, mut on_line: impl FnMut(&str)) -> std::io::Result<()> {
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            break;
        }
        let len = available.len();
        for &byte in available {
            if byte == b'\n' || byte == b'\r' {
                flush_line(&mut pending, &mut on_line);
            } else {
                pending.push(byte);
            }
        }
        reader.consume(len);
    }
    flush_line(&mut pending, &mut on_line);
    Ok(())
}

fn flush_line(pending: &mut Vec<u8>, on_line: &mut impl FnMut(&str)) {
    if pending.is_empty() {
        return;
    }
    {
        let text = String::from_utf8_lossy(pending);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            on_line(trimmed);
        }
    }
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_counter_reads_ffmpeg_stats() {
        assert_eq!(frame_counter("frame=  42 fps=30"), Some(42));
        assert_eq!(frame_counter("frame=1234 fps=29.97 q=28.0 size=1024kB"), Some(1234));
        assert_eq!(frame_counter("frame = 7.5"), Some(7));
    }

    #[test]
    fn lines_without_frame_token_have_no_counter() {
        assert_eq!(frame_counter("fps=30 q=28.0"), None);
        assert_eq!(frame_counter("Input #0, matroska,webm, from 'a.mkv':"), None);
        assert_eq!(frame_counter("Frame=12"), None);
    }

    #[test]
    fn longer_words_ending_in_frame_are_not_the_counter() {
        assert_eq!(frame_counter("keyframe=3 pts=100"), None);
        assert_eq!(frame_counter("keyframe=3 frame=  9 fps=0"), Some(9));
    }

    #[test]
    fn status_text_shows_label_alone_without_counter() {
        assert_eq!(status_text("encode", Some(42)), "encode frame: 42");
        assert_eq!(status_text("encode", None), "encode");
    }

    #[test]
    fn carriage_returns_split_lines() {
        let input = b"header\nframe=  1 fps=0\rframe=  2 fps=0\r\n\nlast".as_slice();
        let mut seen = Vec::new();
        for_each_line(input, |line| seen.push(line.to_string())).expect("read");
        assert_eq!(seen, vec!["header", "frame=  1 fps=0", "frame=  2 fps=0", "last"]);
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let inv = Invocation::new("sh", "encode")
            .args(["-c", "printf 'frame=  42 fps=30\\r' >&2; exit 0"]);
        ProcessRunner::hidden().run(&inv).expect("exit 0 succeeds");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_label_and_code() {
        let inv = Invocation::new("sh", "decompose")
            .args(["-c", "echo 'No such file or directory' >&2; exit 1"]);
        let err = ProcessRunner::hidden().run(&inv).expect_err("exit 1 fails");
        match err {
            ToolkitError::ProcessFailed {
                label,
                code,
                stderr_tail,
            } => {
                assert_eq!(label, "decompose");
                assert_eq!(code, Some(1));
                assert!(stderr_tail.contains("No such file"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn shell_invocation_is_tokenized_by_the_shell() {
        let inv = Invocation::shell("false || exit 3", "fallback");
        let err = ProcessRunner::hidden().run(&inv).expect_err("exit 3");
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn missing_program_is_tool_not_found() {
        let inv = Invocation::new("aesimp-test-no-such-program-4711", "probe");
        let err = ProcessRunner::hidden().run(&inv).expect_err("missing");
        assert!(matches!(err, ToolkitError::ToolNotFound { .. }));
    }
}
