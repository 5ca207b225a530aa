use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::runner::{run_wizard, TerminalInteraction};
use crate::cli::{io, output};
use crate::domain::Expense;
use crate::storage::Filter;
use crate::wizard::field::format_amount;
use crate::wizards::ExpenseWizard;

use super::{subcommand, usage};

const USAGE: &str = "expense [list|mine|new]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "expense",
        "Submit expenses for reimbursement or list them",
        USAGE,
        cmd_expense,
    )]
}

fn cmd_expense(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match subcommand(args).as_str() {
        "list" => list_expenses(context, Filter::All),
        "mine" => {
            let actor = context.acting_member()?;
            list_expenses(context, Filter::eq("submitted_by", actor.to_string()))
        }
        "new" => new_expenses(context),
        _ => Err(usage(USAGE)),
    }
}

fn new_expenses(context: &mut ShellContext) -> CommandResult {
    let actor = context.acting_member()?;
    let flow = context.block_on(ExpenseWizard::load(context.services(), actor))?;
    if let Some(report) = run_wizard(context, flow, &mut TerminalInteraction::new())? {
        for expense in &report.output {
            output::detail(format!("{}  {}", expense.id, expense.description));
        }
    }
    Ok(())
}

fn list_expenses(context: &mut ShellContext, filter: Filter) -> CommandResult {
    let mut expenses = context.block_on(context.services().repo.list::<Expense>(&filter))?;
    if expenses.is_empty() {
        io::print_info("No expenses found.");
        return Ok(());
    }
    expenses.sort_by_key(|expense| expense.spent_on);

    let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
    output::section(format!("Expenses ({})", expenses.len()));
    for expense in &expenses {
        io::print_info(format!(
            "{}  {}  {:<28} {:>10}  {:<9} {:?}{}",
            expense.id,
            expense.spent_on,
            expense.description,
            format_amount(expense.amount),
            expense.category.label(),
            expense.status,
            if expense.receipt.is_some() { "  [receipt]" } else { "" }
        ));
    }
    io::print_info(format!("Total: CHF {}", format_amount(total)));
    Ok(())
}
