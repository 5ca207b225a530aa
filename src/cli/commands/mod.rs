pub mod bootcamp;
pub mod config;
pub mod expense;
pub mod member;
pub mod system;
pub mod team;

use crate::cli::context::CommandError;
use crate::cli::registry::CommandRegistry;

pub fn register_all(registry: &mut CommandRegistry) {
    for entry in system::definitions()
        .into_iter()
        .chain(config::definitions())
        .chain(member::definitions())
        .chain(team::definitions())
        .chain(bootcamp::definitions())
        .chain(expense::definitions())
    {
        registry.register(entry);
    }
}

/// Lower-cased first argument, defaulting to `list`.
pub(crate) fn subcommand(args: &[&str]) -> String {
    args.first()
        .map(|arg| arg.to_lowercase())
        .unwrap_or_else(|| "list".to_string())
}

pub(crate) fn usage(usage: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {}", usage))
}
