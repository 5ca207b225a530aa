//! Line-oriented shell that runs the wizards interactively or from a script.

pub mod commands;
pub mod context;
pub mod help;
pub mod io;
pub mod output;
pub mod registry;
pub mod runner;
mod shell;
pub mod test_mode;

pub use context::{CliError, CliMode, CommandError, CommandResult, ShellContext};
pub use runner::{run_wizard, run_wizard_with_files, TerminalInteraction, WizardInteraction};
pub use shell::run_cli;
