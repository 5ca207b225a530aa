use crate::cli::io;
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandRegistry};

pub fn print_overview(registry: &CommandRegistry) {
    output::section("Available commands");
    for entry in registry.list() {
        io::print_info(format!("  {:<10} {}", entry.name, entry.description));
    }
    io::print_hint("Use `help <command>` for details. Inside a wizard, answer `:help` at any prompt.");
}

pub fn print_command(entry: &CommandEntry) {
    output::section(format!("Help: {}", entry.name));
    io::print_info(format!("  Description: {}", entry.description));
    io::print_info(format!("  Usage: {}", entry.usage));
    let subcommands = entry.subcommands();
    if !subcommands.is_empty() {
        io::print_info(format!("  Subcommands: {}", subcommands.join(", ")));
    }
}
