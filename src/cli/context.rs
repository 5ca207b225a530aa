//! Shell state, command dispatch and error reporting.

use std::{future::Future, io as std_io, sync::Arc};

use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use tokio::runtime::{Builder, EnterGuard, Runtime};
use uuid::Uuid;

use crate::config::{Config, ConfigManager, StoreKind};
use crate::core::utils::PathResolver;
use crate::errors::{ClubError, SessionError, StoreError};
use crate::notify::{CollectingSink, NoticeSink, OutboxNotifier};
use crate::storage::{JsonStore, Repository};
use crate::wizards::Services;

pub use crate::errors::CliError;

use super::commands;
use super::io;
use super::output;
use super::registry::{CommandEntry, CommandRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("No acting member configured. Use `config set acting_member <id>` first.")]
    NoActingMember,
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error("No scripted answer left for `{0}`")]
    ScriptExhausted(String),
    #[error(transparent)]
    Core(#[from] ClubError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Io(#[from] std_io::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        CommandError::Core(ClubError::Store(err))
    }
}

impl From<CliError> for CommandError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Core(inner) => CommandError::Core(inner),
            CliError::Input(message) | CliError::Command(message) => {
                CommandError::InvalidArguments(message)
            }
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<ReadlineError> for CliError {
    fn from(err: ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}

/// Everything a command handler can reach: configuration, the wizard
/// collaborators, the async runtime and the notice buffer.
pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) registry: CommandRegistry,
    config_manager: ConfigManager,
    pub(crate) config: Config,
    services: Services,
    runtime: Runtime,
    sink: Arc<CollectingSink>,
    pub(crate) running: bool,
    pub(crate) last_command: Option<String>,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_config_manager(
        mode: CliMode,
        config_manager: ConfigManager,
    ) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config = config_manager.load()?;
        let services = build_services(&config_manager, &config)?;
        // One worker lets attachment reads finish while the shell waits for input.
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        tracing::debug!(
            base = %config_manager.base_dir().display(),
            store = ?config.store,
            "shell context ready"
        );

        Ok(Self {
            mode,
            registry,
            config_manager,
            config,
            services,
            runtime,
            sink: Arc::new(CollectingSink::new()),
            running: true,
            last_command: None,
        })
    }

    pub fn services(&self) -> Services {
        self.services.clone()
    }

    pub(crate) fn sink(&self) -> Arc<dyn NoticeSink> {
        self.sink.clone()
    }

    /// Prints and clears every notice the wizards emitted so far.
    pub(crate) fn flush_notices(&self) {
        for notice in self.sink.drain() {
            output::notice(&notice);
        }
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Makes the runtime current so background tasks can be spawned.
    pub(crate) fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    pub(crate) fn acting_member(&self) -> Result<Uuid, CommandError> {
        self.config.acting_member.ok_or(CommandError::NoActingMember)
    }

    pub(crate) fn prompt(&self) -> String {
        format!("{}> ", self.config.club_name.to_lowercase().replace(' ', "-"))
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn show_config(&self) -> CommandResult {
        output::section("Configuration");
        for (key, value) in self.config.entries() {
            let shown = if value.is_empty() { "-" } else { value.as_str() };
            io::print_info(format!("  {:<16} {}", key, shown));
        }
        io::print_info(format!(
            "  {:<16} {}",
            "file",
            self.config_manager.path().display()
        ));
        Ok(())
    }

    /// Updates one setting, saves it and rebuilds the collaborators so the
    /// next wizard sees the change.
    pub(crate) fn set_config_value(&mut self, key: &str, value: &str) -> CommandResult {
        let mut updated = self.config.clone();
        updated.set(key, value)?;
        self.config_manager.save(&updated)?;
        self.services = build_services(&self.config_manager, &updated)?;
        self.config = updated;
        io::print_success(format!("Set `{}`.", key));
        Ok(())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            tracing::debug!(command, args = args.len(), "dispatching command");
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = self.closest_command(input) {
            io::print_hint(format!("Did you mean `{}`?", best));
        }
    }

    fn closest_command(&self, input: &str) -> Option<&'static str> {
        let needle = input.to_lowercase();
        self.registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance)
            .filter(|(distance, _)| *distance <= 3)
            .map(|(_, name)| name)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(io::confirm_action("Exit shell?", true)?)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        tracing::warn!(command = ?self.last_command, error = %err, "command failed");
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                io::print_error(message);
                io::print_hint("Use `help <command>` for usage details.");
            }
            missing @ CommandError::NoActingMember => {
                io::print_error(missing);
                io::print_hint("Run `member list` to find the id of the member you act for.");
            }
            other => io::print_error(other),
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        super::shell::handle_line(self, line)
    }
}

fn build_services(manager: &ConfigManager, config: &Config) -> Result<Services, ClubError> {
    let base = manager.base_dir().to_path_buf();
    let repo = match config.store {
        StoreKind::Json => Repository::new(Arc::new(JsonStore::new(Some(base.clone()))?)),
        StoreKind::Memory => Repository::memory(),
    };
    let notifier = Arc::new(OutboxNotifier::new(PathResolver::outbox_file_in(&base)));
    Ok(Services::from_config(repo, notifier, config))
}
