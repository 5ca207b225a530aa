use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;

use super::usage;

const USAGE: &str = "config [show|set <key> <value>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change club settings",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_lowercase()).as_deref() {
        None | Some("show") => context.show_config(),
        Some("set") if args.len() >= 2 => {
            // `config set treasurer_email` with no value clears it.
            let value = args[2..].join(" ");
            context.set_config_value(args[1], value.trim())
        }
        _ => Err(usage(USAGE)),
    }
}
