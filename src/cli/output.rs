use colored::Colorize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::notify::{Notice, NoticeLevel};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
    Detail,
}

static PLAIN: AtomicBool = AtomicBool::new(false);

/// Disables colours, e.g. when output is piped in script mode.
pub fn set_plain(plain: bool) {
    PLAIN.store(plain, Ordering::Relaxed);
    colored::control::set_override(!plain);
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "INFO",
        MessageKind::Success => "SUCCESS",
        MessageKind::Warning => "WARNING",
        MessageKind::Error => "ERROR",
        MessageKind::Hint => "HINT",
        MessageKind::Section | MessageKind::Detail => "",
    }
}

pub(crate) fn format_message(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let base = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        MessageKind::Detail => format!("    {}", text),
        _ => format!("{}: {}", label(kind), text),
    };

    if PLAIN.load(Ordering::Relaxed) {
        return base;
    }

    match kind {
        MessageKind::Success => base.bright_green().to_string(),
        MessageKind::Warning => base.bright_yellow().to_string(),
        MessageKind::Error => base.bright_red().to_string(),
        MessageKind::Hint => base.bright_cyan().to_string(),
        MessageKind::Section => base.bold().to_string(),
        MessageKind::Detail => base.dimmed().to_string(),
        MessageKind::Info => base,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = format_message(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

pub fn detail(message: impl fmt::Display) {
    print(MessageKind::Detail, message);
}

/// Prints a wizard notice; refresh signals only go to the log.
pub fn notice(notice: &Notice) {
    match notice {
        Notice::Message { level, text } => match level {
            NoticeLevel::Info => info(text),
            NoticeLevel::Success => success(text),
            NoticeLevel::Warning => warning(text),
            NoticeLevel::Error => error(text),
        },
        Notice::Refresh(collection) => tracing::debug!(collection, "refresh requested"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_messages_carry_their_label() {
        set_plain(true);
        assert_eq!(
            format_message(MessageKind::Warning, "careful"),
            "WARNING: careful"
        );
        assert_eq!(format_message(MessageKind::Section, " Teams "), "=== Teams ===");
        assert_eq!(format_message(MessageKind::Detail, "x"), "    x");
    }
}
