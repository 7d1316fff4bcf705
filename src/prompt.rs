use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect};

const ALL_CHOICES: &str = "All of them";

#[derive(Debug, Clone)]
pub struct NumberRequest<'a> {
    pub min: u32,
    pub max: u32,
    pub default: u32,
    pub info: Option<&'a str>,
}

pub trait Prompt {
    /// Yes/no consent; only an explicit "y" counts as yes.
    fn confirm(&self, question: &str) -> bool;

    /// Bounded integer; an empty answer picks the default.
    fn number(&self, request: &NumberRequest<'_>) -> u32;

    /// Subset of `choices`; every choice when the user picks "all".
    fn choose_many(&self, question: &str, choices: &[&str]) -> Vec<String>;

    /// Blocks until the user acknowledges `message`.
    fn pause(&self, message: &str);
}

/// Interactive prompt on the terminal.
///
/// When the console cannot be driven (closed stdin, no tty) every question
/// falls back to its default answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

fn console_fallback(question: &str, error: dialoguer::Error) {
    tracing::warn!(question, error = %error, "console prompt unavailable, using default");
}

impl Prompt for ConsolePrompt {
    fn confirm(&self, question: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                console_fallback(question, e);
                false
            })
    }

    fn number(&self, request: &NumberRequest<'_>) -> u32 {
        if let Some(info) = request.info {
            println!("{info}");
        }
        let question = format!(
            "Please enter a number between {} - {}",
            request.min, request.max
        );
        Input::<u32>::with_theme(&ColorfulTheme::default())
            .with_prompt(&question)
            .default(request.default)
            .validate_with(|value: &u32| check_range(*value, request))
            .interact_text()
            .unwrap_or_else(|e| {
                console_fallback(&question, e);
                request.default
            })
    }

    fn choose_many(&self, question: &str, choices: &[&str]) -> Vec<String> {
        let mut items = vec![ALL_CHOICES];
        items.extend_from_slice(choices);
        let mut defaults = vec![false; items.len()];
        defaults[0] = true;
        let picked = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .items(&items)
            .defaults(&defaults)
            .interact()
            .unwrap_or_else(|e| {
                console_fallback(question, e);
                vec![0]
            });
        resolve_choices(&picked, choices)
    }

    fn pause(&self, message: &str) {
        let answer = Input::<String>::new()
            .with_prompt(message.trim())
            .allow_empty(true)
            .interact_text();
        if let Err(e) = answer {
            console_fallback(message, e);
        }
    }
}

/// Non-interactive answers: consent granted, defaults taken, everything chosen.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompt {
    pub assume_yes: bool,
}

impl Prompt for AutoPrompt {
    fn confirm(&self, question: &str) -> bool {
        tracing::info!(question, answer = self.assume_yes, "answered automatically");
        self.assume_yes
    }

    fn number(&self, request: &NumberRequest<'_>) -> u32 {
        request.default.clamp(request.min, request.max)
    }

    fn choose_many(&self, _question: &str, choices: &[&str]) -> Vec<String> {
        choices.iter().map(|c| c.to_string()).collect()
    }

    fn pause(&self, _message: &str) {}
}

pub fn check_range(value: u32, request: &NumberRequest<'_>) -> std::result::Result<(), String> {
    if (request.min..=request.max).contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Number must be between {} and {}.",
            request.min, request.max
        ))
    }
}

/// Maps checkbox indices (0 = "all of them") back onto `choices`.
pub fn resolve_choices(picked: &[usize], choices: &[&str]) -> Vec<String> {
    if picked.contains(&0) {
        return choices.iter().map(|c| c.to_string()).collect();
    }
    picked
        .iter()
        .filter_map(|i| choices.get(i.checked_sub(1)?))
        .map(|c| c.to_string())
        .collect()
}
