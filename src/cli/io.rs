use std::fmt;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::cli::context::CommandError;
use crate::cli::output;
use crate::cli::test_mode::{self, Scripted};
use crate::wizard::field::parse_bool;

pub fn print_info(message: impl fmt::Display) {
    output::info(message);
}

pub fn print_warning(message: impl fmt::Display) {
    output::warning(message);
}

pub fn print_error(message: impl fmt::Display) {
    output::error(message);
}

pub fn print_success(message: impl fmt::Display) {
    output::success(message);
}

pub fn print_hint(message: impl fmt::Display) {
    output::hint(message);
}

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

fn scripted(label: &str) -> Result<Option<String>, CommandError> {
    match test_mode::next_input(label) {
        Scripted::Disabled => Ok(None),
        Scripted::Exhausted => Err(CommandError::ScriptExhausted(label.to_string())),
        Scripted::Input(input) => Ok(Some(input)),
    }
}

/// Yes/no question.
pub fn confirm_action(prompt: &str, default: bool) -> Result<bool, CommandError> {
    if let Some(answer) = scripted(prompt)? {
        return Ok(parse_bool(&answer).unwrap_or(default));
    }
    Confirm::with_theme(&theme())
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}

/// Free-form text; an empty answer is allowed and returned as-is.
pub fn prompt_text(prompt: &str) -> Result<String, CommandError> {
    if let Some(answer) = scripted(prompt)? {
        return Ok(answer);
    }
    Input::<String>::with_theme(&theme())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(CommandError::from)
}

/// Menu selection; scripted answers may be an item label or a 1-based index.
pub fn select_item(prompt: &str, items: &[&str], default: usize) -> Result<usize, CommandError> {
    if let Some(answer) = scripted(prompt)? {
        let answer = answer.trim();
        if let Ok(index) = answer.parse::<usize>() {
            if (1..=items.len()).contains(&index) {
                return Ok(index - 1);
            }
        }
        return items
            .iter()
            .position(|item| item.eq_ignore_ascii_case(answer))
            .ok_or_else(|| {
                CommandError::InvalidArguments(format!(
                    "`{}` is not one of: {}",
                    answer,
                    items.join(", ")
                ))
            });
    }
    Select::with_theme(&theme())
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}
