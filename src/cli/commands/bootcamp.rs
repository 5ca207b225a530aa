use std::collections::HashMap;

use uuid::Uuid;

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::runner::{run_wizard, TerminalInteraction};
use crate::cli::{io, output};
use crate::domain::{Bootcamp, BootcampRegistration, Member, NewBootcamp};
use crate::storage::Filter;
use crate::wizard::field::parse_date;
use crate::wizards::BootcampRegistrationWizard;

use super::{subcommand, usage};

const USAGE: &str =
    "bootcamp [list|add <name> <location> <start> <end> <capacity>|register|registrations]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "bootcamp",
        "Manage training camps and register participants",
        USAGE,
        cmd_bootcamp,
    )]
}

fn cmd_bootcamp(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match subcommand(args).as_str() {
        "list" => list_camps(context),
        "add" => add_camp(context, &args[1..]),
        "register" => register(context),
        "registrations" => list_registrations(context),
        _ => Err(usage(USAGE)),
    }
}

fn add_camp(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name, location, start, end, capacity] = args else {
        return Err(usage("bootcamp add <name> <location> <start> <end> <capacity>"));
    };
    let date = |raw: &str| {
        parse_date(raw).ok_or_else(|| {
            CommandError::InvalidArguments(format!("`{}` is not a date (YYYY-MM-DD)", raw))
        })
    };
    let payload = NewBootcamp {
        name: name.trim().to_string(),
        location: location.trim().to_string(),
        starts_on: date(*start)?,
        ends_on: date(*end)?,
        capacity: capacity.parse().map_err(|_| {
            CommandError::InvalidArguments(format!("`{}` is not a valid capacity", capacity))
        })?,
        participant_ids: Vec::new(),
    };
    if payload.ends_on < payload.starts_on {
        return Err(CommandError::InvalidArguments(
            "a camp cannot end before it starts".into(),
        ));
    }

    let camp = context.block_on(context.services().repo.create::<Bootcamp>(&payload))?;
    tracing::info!(bootcamp = %camp.id, "training camp added");
    io::print_success(format!("Training camp {} added ({}).", camp.name, camp.id));
    Ok(())
}

fn register(context: &mut ShellContext) -> CommandResult {
    let actor = context.acting_member()?;
    let flow = context.block_on(BootcampRegistrationWizard::load(context.services(), actor))?;
    if let Some(report) = run_wizard(context, flow, &mut TerminalInteraction::new())? {
        let receipt = report.output;
        io::print_info(format!(
            "{} place(s) left in {}.",
            receipt.bootcamp.remaining_places(),
            receipt.bootcamp.name
        ));
    }
    Ok(())
}

fn list_camps(context: &mut ShellContext) -> CommandResult {
    let mut camps =
        context.block_on(context.services().repo.list::<Bootcamp>(&Filter::All))?;
    if camps.is_empty() {
        io::print_info("No training camps yet. Use `bootcamp add` to create one.");
        return Ok(());
    }
    camps.sort_by_key(|camp| camp.starts_on);

    output::section(format!("Training camps ({})", camps.len()));
    for camp in &camps {
        io::print_info(format!(
            "{}  {:<32} {}/{} places taken",
            camp.id,
            crate::domain::Displayable::display_label(camp),
            camp.participant_ids.len(),
            camp.capacity
        ));
    }
    Ok(())
}

fn list_registrations(context: &mut ShellContext) -> CommandResult {
    let services = context.services();
    let registrations =
        context.block_on(services.repo.list::<BootcampRegistration>(&Filter::All))?;
    if registrations.is_empty() {
        io::print_info("No registrations yet.");
        return Ok(());
    }
    let camps: HashMap<Uuid, String> = context
        .block_on(services.repo.list::<Bootcamp>(&Filter::All))?
        .into_iter()
        .map(|camp| (camp.id, camp.name))
        .collect();
    let members: HashMap<Uuid, String> = context
        .block_on(services.repo.list::<Member>(&Filter::All))?
        .into_iter()
        .map(|member| (member.id, member.full_name()))
        .collect();
    let name_of = |map: &HashMap<Uuid, String>, id: &Uuid| {
        map.get(id).cloned().unwrap_or_else(|| id.to_string())
    };

    output::section(format!("Registrations ({})", registrations.len()));
    for registration in &registrations {
        let by = if registration.is_for_self() {
            String::new()
        } else {
            format!(" (by {})", name_of(&members, &registration.registered_by))
        };
        io::print_info(format!(
            "{}  {} → {}{}",
            registration.registered_at.format("%Y-%m-%d"),
            name_of(&members, &registration.participant_id),
            name_of(&camps, &registration.bootcamp_id),
            by
        ));
    }
    Ok(())
}
