//! Scripted prompt answers for non-interactive runs.
//!
//! When `CLUB_CORE_TEST_INPUTS` is set, every prompt takes its answer from
//! that `|`-separated list instead of the terminal. `<BLANK>` stands for an
//! empty answer.

use once_cell::sync::Lazy;
use std::{
    collections::VecDeque,
    env,
    sync::{Mutex, MutexGuard, PoisonError},
};

const INPUTS_ENV: &str = "CLUB_CORE_TEST_INPUTS";

/// Outcome of asking the script for the next answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// No script installed; prompt the terminal.
    Disabled,
    /// A script is installed but has no answers left.
    Exhausted,
    Input(String),
}

struct InputQueue {
    enabled: bool,
    inputs: VecDeque<String>,
}

impl InputQueue {
    fn from_env() -> Self {
        match env::var(INPUTS_ENV) {
            Ok(raw) => Self {
                enabled: true,
                inputs: parse_inputs(&raw),
            },
            Err(_) => Self {
                enabled: false,
                inputs: VecDeque::new(),
            },
        }
    }
}

static TEXT_INPUTS: Lazy<Mutex<InputQueue>> = Lazy::new(|| Mutex::new(InputQueue::from_env()));

fn queue() -> MutexGuard<'static, InputQueue> {
    TEXT_INPUTS.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn is_active() -> bool {
    queue().enabled
}

pub fn next_input(label: &str) -> Scripted {
    let mut guard = queue();
    if !guard.enabled {
        return Scripted::Disabled;
    }
    match guard.inputs.pop_front() {
        Some(input) => {
            tracing::debug!(prompt = label, input = %input, "scripted answer");
            Scripted::Input(input)
        }
        None => Scripted::Exhausted,
    }
}

pub fn install_inputs<I, S>(inputs: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut guard = queue();
    guard.enabled = true;
    guard.inputs = inputs.into_iter().map(Into::into).collect();
}

pub fn reset_inputs() {
    let mut guard = queue();
    guard.enabled = false;
    guard.inputs.clear();
}

fn parse_inputs(raw: &str) -> VecDeque<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.to_ascii_uppercase().as_str() {
            "<BLANK>" | "<EMPTY>" => String::new(),
            _ => segment.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blank_markers_and_skips_empty_segments() {
        let parsed = parse_inputs("Anna| <blank> ||:back|yes");
        assert_eq!(
            parsed,
            VecDeque::from(vec![
                "Anna".to_string(),
                String::new(),
                ":back".to_string(),
                "yes".to_string()
            ])
        );
    }
}
