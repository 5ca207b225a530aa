use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::runner::{run_wizard, TerminalInteraction};
use crate::cli::{io, output};
use crate::domain::{Member, Role};
use crate::storage::Filter;
use crate::wizards::CreateMemberWizard;

use super::{subcommand, usage};

const USAGE: &str = "member [list|new]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "member",
        "List members or register a new one",
        USAGE,
        cmd_member,
    )]
}

fn cmd_member(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match subcommand(args).as_str() {
        "list" => list_members(context),
        "new" => new_member(context),
        _ => Err(usage(USAGE)),
    }
}

fn new_member(context: &mut ShellContext) -> CommandResult {
    let flow = context.block_on(CreateMemberWizard::load(context.services()))?;
    if let Some(report) = run_wizard(context, flow, &mut TerminalInteraction::new())? {
        io::print_info(format!("Member id: {}", report.output.id));
    }
    Ok(())
}

fn list_members(context: &mut ShellContext) -> CommandResult {
    let mut members =
        context.block_on(context.services().repo.list::<Member>(&Filter::All))?;
    if members.is_empty() {
        io::print_info("No members yet. Use `member new` to add one.");
        return Ok(());
    }
    members.sort_by_key(|member| (member.last_name.clone(), member.first_name.clone()));

    output::section(format!("Members ({})", members.len()));
    for member in &members {
        let roles: Vec<&str> = member.roles.iter().map(Role::label).collect();
        io::print_info(format!(
            "{}  {:<24} {:<28} {}",
            member.id,
            member.full_name(),
            member.email,
            roles.join(", ")
        ));
    }
    Ok(())
}
