use std::collections::HashMap;

use uuid::Uuid;

use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::runner::{run_wizard, TerminalInteraction};
use crate::cli::{io, output};
use crate::domain::{Member, Team};
use crate::storage::Filter;
use crate::wizards::CreateTeamWizard;

use super::{subcommand, usage};

const USAGE: &str = "team [list|new]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "team",
        "List teams or create one with coaches and players",
        USAGE,
        cmd_team,
    )]
}

fn cmd_team(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match subcommand(args).as_str() {
        "list" => list_teams(context),
        "new" => new_team(context),
        _ => Err(usage(USAGE)),
    }
}

fn new_team(context: &mut ShellContext) -> CommandResult {
    let flow = context.block_on(CreateTeamWizard::load(context.services()))?;
    if let Some(report) = run_wizard(context, flow, &mut TerminalInteraction::new())? {
        io::print_info(format!("Team id: {}", report.output.id));
    }
    Ok(())
}

fn list_teams(context: &mut ShellContext) -> CommandResult {
    let services = context.services();
    let teams = context.block_on(services.repo.list::<Team>(&Filter::All))?;
    if teams.is_empty() {
        io::print_info("No teams yet. Use `team new` to create one.");
        return Ok(());
    }
    let members = context.block_on(services.repo.list::<Member>(&Filter::All))?;
    let names: HashMap<Uuid, String> = members
        .iter()
        .map(|member| (member.id, member.full_name()))
        .collect();
    let named = |ids: &[Uuid]| -> String {
        let list: Vec<&str> = ids
            .iter()
            .filter_map(|id| names.get(id).map(String::as_str))
            .collect();
        if list.is_empty() {
            "-".to_string()
        } else {
            list.join(", ")
        }
    };

    output::section(format!("Teams ({})", teams.len()));
    for team in &teams {
        io::print_info(format!(
            "{}  {} ({}{})",
            team.id,
            team.name,
            team.season,
            team.league
                .as_deref()
                .map(|league| format!(", {}", league))
                .unwrap_or_default()
        ));
        output::detail(format!("Coaches: {}", named(&team.coach_ids)));
        output::detail(format!("Players: {}", named(&team.player_ids)));
    }
    Ok(())
}
