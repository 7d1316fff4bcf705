use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    #[error("error while installing <{package}>: {reason}")]
    InstallFailed { package: String, reason: String },

    #[error("{label} failed with code {}{}", display_code(.code), fmt_stderr_tail(.stderr_tail))]
    ProcessFailed {
        label: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("could not remove working folder {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolkitError {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn install_failed(package: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstallFailed {
            package: package.into(),
            reason: reason.to_string(),
        }
    }

    /// Exit code of a failed external process, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessFailed { code, .. } => *code,
            _ => None,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "<terminated>".to_string(),
    }
}

fn fmt_stderr_tail(tail: &str) -> String {
    if tail.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", tail.trim_end())
    }
}

pub type Result<T> = std::result::Result<T, ToolkitError>;
