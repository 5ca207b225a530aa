//! Drives a [`WizardSession`] from the terminal, one field at a time.
//!
//! Besides plain values every prompt understands `:back`, `:cancel`, `:keep`,
//! `:clear`, `:help` and `:attach <path>`. An empty answer keeps the current
//! value. Attached files are read in the background; prompting carries on and
//! each read is applied to the draft once it has completed.

use std::{path::PathBuf, sync::Arc};

use crate::cli::context::{CommandError, ShellContext};
use crate::cli::{io, output};
use crate::device::{spawn_read, FileSource, FsFileSource, PendingRead};
use crate::errors::SessionError;
use crate::wizard::{
    CommitReport, FieldKind, FieldView, NavigationEvent, WizardFlow, WizardPosition,
    WizardSession,
};

/// How a prompt was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Value(String),
    Keep,
    Back,
    Cancel,
    Help,
    Attach(PathBuf),
}

/// Answer to the review screen on the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResponse {
    Confirm,
    Back,
    Cancel,
}

pub struct PromptContext<'a> {
    pub field: &'a FieldView,
    pub step_label: &'a str,
    pub position: WizardPosition,
}

/// Source of answers for [`run_wizard`].
pub trait WizardInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> Result<PromptResponse, CommandError>;

    fn confirm(&mut self, summary: &[(String, String)])
        -> Result<ConfirmationResponse, CommandError>;
}

/// Reads a prompt answer, recognising the colon commands.
pub fn parse_response(raw: &str, current: Option<&str>) -> PromptResponse {
    let trimmed = raw.trim();
    if let Some(path) = trimmed.strip_prefix(":attach ") {
        return PromptResponse::Attach(PathBuf::from(path.trim()));
    }
    match trimmed {
        ":back" => PromptResponse::Back,
        ":cancel" => PromptResponse::Cancel,
        ":keep" => PromptResponse::Keep,
        ":help" | "?" => PromptResponse::Help,
        ":clear" => PromptResponse::Value(String::new()),
        "" if current.is_some_and(|value| !value.is_empty()) => PromptResponse::Keep,
        _ => PromptResponse::Value(raw.to_string()),
    }
}

/// Terminal prompts through dialoguer, or scripted answers in test mode.
#[derive(Debug, Default)]
pub struct TerminalInteraction;

impl TerminalInteraction {
    pub fn new() -> Self {
        Self
    }
}

impl WizardInteraction for TerminalInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> Result<PromptResponse, CommandError> {
        let descriptor = &context.field.descriptor;
        match &descriptor.kind {
            FieldKind::Choice(options) | FieldKind::MultiChoice(options) if !options.is_empty() => {
                output::detail(format!("Options: {}", options.join(", ")));
            }
            FieldKind::Attachment => output::detail("Use `:attach <path>` to add a file."),
            _ => {}
        }
        let current = context.field.value.as_deref().filter(|value| !value.is_empty());
        if let Some(current) = current {
            output::detail(format!("Current: {}", current));
        }

        let marker = if descriptor.required { " *" } else { "" };
        let raw = io::prompt_text(&format!("{}{}", descriptor.label, marker))?;
        Ok(parse_response(&raw, current))
    }

    fn confirm(
        &mut self,
        summary: &[(String, String)],
    ) -> Result<ConfirmationResponse, CommandError> {
        output::section("Review");
        for (label, value) in summary {
            output::detail(format!("{:<20} {}", label, value));
        }
        let choice = io::select_item("Submit?", &["Submit", "Back", "Cancel"], 0)?;
        Ok(match choice {
            0 => ConfirmationResponse::Confirm,
            1 => ConfirmationResponse::Back,
            _ => ConfirmationResponse::Cancel,
        })
    }
}

/// Runs `flow` to completion. Returns `None` when the user cancels.
pub fn run_wizard<F: WizardFlow>(
    context: &ShellContext,
    flow: F,
    interaction: &mut dyn WizardInteraction,
) -> Result<Option<CommitReport<F::Output>>, CommandError> {
    run_wizard_with_files(context, flow, interaction, Arc::new(FsFileSource))
}

pub fn run_wizard_with_files<F: WizardFlow>(
    context: &ShellContext,
    flow: F,
    interaction: &mut dyn WizardInteraction,
    files: Arc<dyn FileSource>,
) -> Result<Option<CommitReport<F::Output>>, CommandError> {
    let mut session = WizardSession::new(flow, context.sink())?;
    let mut attachments = PendingAttachments::new(files);
    let outcome = drive(context, &mut session, interaction, &mut attachments);
    if outcome.is_err() {
        session.cancel();
    }
    context.flush_notices();
    outcome
}

/// File reads started with `:attach` that have not reached the draft yet.
struct PendingAttachments {
    files: Arc<dyn FileSource>,
    reads: Vec<(String, PendingRead)>,
}

impl PendingAttachments {
    fn new(files: Arc<dyn FileSource>) -> Self {
        Self {
            files,
            reads: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Starts reading `path` for field `key`, replacing an earlier read for it.
    fn start(&mut self, context: &ShellContext, key: &str, path: PathBuf) {
        self.reads.retain(|(pending_key, _)| pending_key != key);
        let pending = {
            let _runtime = context.enter();
            spawn_read(self.files.clone(), path)
        };
        io::print_info(format!("Reading {} ...", pending.path.display()));
        self.reads.push((key.to_string(), pending));
    }

    /// Applies the completed reads, or all of them when `wait` is set.
    /// Returns how many could not be attached.
    fn settle<F: WizardFlow>(
        &mut self,
        context: &ShellContext,
        session: &mut WizardSession<F>,
        wait: bool,
    ) -> Result<usize, CommandError> {
        let (ready, running): (Vec<_>, Vec<_>) = self
            .reads
            .drain(..)
            .partition(|(_, read)| wait || read.is_finished());
        self.reads = running;

        let mut failed = 0;
        for (key, read) in ready {
            let file = read.path.display().to_string();
            match context.block_on(session.attach_pending(&key, read)) {
                Ok(()) => io::print_success(format!("Attached {}.", file)),
                Err(SessionError::Blocked(err)) => {
                    failed += 1;
                    io::print_warning(format!("{}: {}", file, err));
                }
                Err(SessionError::Device(err)) => {
                    failed += 1;
                    io::print_warning(err);
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(failed)
    }
}

fn drive<F: WizardFlow>(
    context: &ShellContext,
    session: &mut WizardSession<F>,
    interaction: &mut dyn WizardInteraction,
    attachments: &mut PendingAttachments,
) -> Result<Option<CommitReport<F::Output>>, CommandError> {
    let mut shown: Option<F::Step> = None;
    let mut field_index = 0usize;

    loop {
        attachments.settle(context, session, false)?;
        let view = session.view();
        if shown != Some(view.step) {
            output::section(format!("{} · {} {}", view.position, view.icon, view.label));
            shown = Some(view.step);
            field_index = 0;
        }

        if let Some(field) = view.fields.get(field_index) {
            let prompt = PromptContext {
                field,
                step_label: view.label,
                position: view.position,
            };
            let key = field.descriptor.key.as_str();
            match interaction.prompt_field(&prompt)? {
                PromptResponse::Value(raw) => match session.input(key, &raw) {
                    Ok(()) => field_index += 1,
                    Err(SessionError::Blocked(err)) => io::print_warning(err),
                    Err(other) => return Err(other.into()),
                },
                PromptResponse::Keep => field_index += 1,
                PromptResponse::Help => match field.descriptor.help {
                    Some(help) => io::print_hint(help),
                    None => io::print_hint("Answer the prompt, or use :back, :cancel or :keep."),
                },
                PromptResponse::Attach(path) => {
                    attachments.start(context, key, path);
                    field_index += 1;
                }
                PromptResponse::Back if field_index > 0 => field_index -= 1,
                PromptResponse::Back => step_back(session)?,
                PromptResponse::Cancel => return Ok(cancelled(session)),
            }
            continue;
        }

        if session.can_finish() {
            if !attachments.is_empty() {
                output::detail("Attachments are still being read.");
            }
            match interaction.confirm(&session.summary())? {
                ConfirmationResponse::Confirm => {
                    // Show the review again when a file could not be attached.
                    if attachments.settle(context, session, true)? > 0 {
                        continue;
                    }
                    match context.block_on(session.finish()) {
                        Ok(report) => return Ok(Some(report)),
                        Err(SessionError::Blocked(err)) => {
                            io::print_warning(err);
                            field_index = 0;
                        }
                        // The session already reported the failure; the draft is intact.
                        Err(SessionError::Commit(_)) => context.flush_notices(),
                        Err(other) => return Err(other.into()),
                    }
                }
                ConfirmationResponse::Back if !view.fields.is_empty() => {
                    field_index = view.fields.len() - 1;
                }
                ConfirmationResponse::Back => step_back(session)?,
                ConfirmationResponse::Cancel => return Ok(cancelled(session)),
            }
            continue;
        }

        match session.next()? {
            NavigationEvent::Moved { from, to } => {
                tracing::debug!(?from, ?to, "wizard step advanced");
            }
            NavigationEvent::Blocked(err) => {
                io::print_warning(err);
                field_index = 0;
            }
            NavigationEvent::Repeat => field_index = 0,
        }
    }
}

fn step_back<F: WizardFlow>(session: &mut WizardSession<F>) -> Result<(), CommandError> {
    if let NavigationEvent::Repeat = session.back()? {
        io::print_info("Already at the first step.");
    }
    Ok(())
}

fn cancelled<T, F: WizardFlow>(session: &mut WizardSession<F>) -> Option<T> {
    session.cancel();
    io::print_info("Wizard cancelled; nothing was saved.");
    None
}
