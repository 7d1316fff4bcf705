use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    // Helpers share our console; never let them open one of their own.
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

/// One external call: what to run, with which arguments, shown under which label.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub label: String,
    pub current_dir: Option<PathBuf>,
    shell: bool,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            label: label.into(),
            current_dir: None,
            shell: false,
        }
    }

    /// A command line the system shell tokenizes. The caller owns quoting;
    /// nothing here re-escapes `line`.
    pub fn shell(line: impl Into<String>, label: impl Into<String>) -> Self {
        let line = line.into();
        let (program, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let mut invocation = Self::new(program, label);
        invocation.args = vec![OsString::from(flag), OsString::from(line)];
        invocation.shell = true;
        invocation
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn uses_shell(&self) -> bool {
        self.shell
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = command(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Human-readable rendering for logs.
    pub fn display_line(&self) -> String {
        let mut out = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            let text = arg.to_string_lossy();
            out.push(' ');
            if text.contains(char::is_whitespace) {
                out.push('"');
                out.push_str(&text);
                out.push('"');
            } else {
                out.push_str(&text);
            }
        }
        out
    }
}
