use crate::config;
use crate::prompt::Prompt;
use crate::recipes::{self, Mode};
use crate::shell;
use crate::toolkit::Toolkit;
use crate::ToolkitError;
use std::fmt::Display;
use std::path::PathBuf;

const PAUSE_MESSAGE: &str = "\nPress Enter to continue: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Install,
    Uninstall,
    ClearCache,
    Recipe(Mode),
}

impl Command {
    /// No name means `install`, matching a double-click on the binary.
    pub fn parse(name: Option<&str>) -> Option<Command> {
        match name {
            None | Some("install") => Some(Command::Install),
            Some("uninstall") => Some(Command::Uninstall),
            Some("clear-cache") => Some(Command::ClearCache),
            Some(other) => Mode::from_name(other).map(Command::Recipe),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Some files of the batch failed or left a working folder behind.
    Partial,
    Failed,
    UnknownMode,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Completed => 0,
            Outcome::Partial => 1,
            Outcome::Failed => 2,
            Outcome::UnknownMode => 64,
        }
    }
}

pub struct Dispatcher<'a> {
    kit: &'a Toolkit,
    pause_on_error: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(kit: &'a Toolkit, pause_on_error: bool) -> Self {
        Self {
            kit,
            pause_on_error,
        }
    }

    pub fn dispatch(&self, name: Option<&str>, files: &[PathBuf]) -> Outcome {
        let Some(command) = Command::parse(name) else {
            let name = name.unwrap_or_default();
            tracing::warn!(mode = name, "unknown mode");
            println!("No module <{name}> found");
            self.pause();
            return Outcome::UnknownMode;
        };
        tracing::debug!(command = ?command, files = files.len(), "dispatching");

        match command {
            Command::Install => self.install(),
            Command::Uninstall => match shell::uninstall(&self.kit.paths) {
                Ok(removed) => {
                    println!("Removed {removed} launcher(s)");
                    Outcome::Completed
                }
                Err(e) => self.fail(e),
            },
            Command::ClearCache => {
                let removed = self.kit.resolver().cache().clear();
                println!("Cleared {removed} cached tool path(s)");
                Outcome::Completed
            }
            Command::Recipe(mode) => self.recipe(mode, files),
        }
    }

    fn install(&self) -> Outcome {
        // Leave an editable settings file behind on first install.
        if !self.kit.paths.settings_path().exists() {
            if let Err(e) = config::save_settings(&self.kit.paths, &self.kit.settings) {
                return self.fail(e);
            }
        }
        match shell::install(&self.kit.paths, self.kit.prompt()) {
            Ok(report) => {
                println!("Successfully created {} launcher(s)", report.launchers.len());
                println!();
                println!("You can now right-click on files, open 'Send to' and pick a tool.");
                Outcome::Completed
            }
            Err(e) => self.fail(e),
        }
    }

    fn recipe(&self, mode: Mode, files: &[PathBuf]) -> Outcome {
        if files.is_empty() {
            println!("No files selected for <{mode}>");
            self.pause();
            return Outcome::Failed;
        }
        match recipes::run(self.kit, mode, files) {
            Ok(report) => {
                println!("{mode}: {}", report.summary());
                if report.is_clean() {
                    Outcome::Completed
                } else {
                    self.pause();
                    Outcome::Partial
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, error: ToolkitError) -> Outcome {
        report_failure(self.kit.prompt(), self.pause_on_error, &error)
    }

    fn pause(&self) {
        if self.pause_on_error {
            self.kit.prompt().pause(PAUSE_MESSAGE);
        }
    }
}

/// Prints `error` and waits for Enter. Also used before a toolkit exists,
/// e.g. when the settings file cannot be read.
pub fn report_failure(prompt: &dyn Prompt, pause: bool, error: &dyn Display) -> Outcome {
    tracing::error!(error = %error, "command failed");
    println!("An error occurred!");
    println!("{error}");
    if pause {
        prompt.pause(PAUSE_MESSAGE);
    }
    Outcome::Failed
}
