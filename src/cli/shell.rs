use std::{
    borrow::Cow,
    collections::BTreeMap,
    io::{self, BufRead, StdinLock},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::context::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{help, io as cli_io, output};

const SCRIPT_ENV: &str = "CLUB_CORE_CLI_SCRIPT";

/// Starts the shell. With `CLUB_CORE_CLI_SCRIPT` set, commands are read line
/// by line from stdin and output is uncoloured.
pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    output::set_plain(mode == CliMode::Script);

    let mut context = ShellContext::new(mode)?;
    tracing::info!(?mode, club = %context.config.club_name, "shell started");

    let mut source = match mode {
        CliMode::Interactive => {
            help::print_overview(&context.registry);
            LineSource::editor(&context)?
        }
        CliMode::Script => LineSource::Script(io::stdin().lock()),
    };

    while context.running {
        match source.read(&context.prompt())? {
            Line::Command(line) => match handle_line(&mut context, &line) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => break,
                Err(err) => context.report_error(err)?,
            },
            Line::Skip => {}
            Line::Interrupted => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Line::End => {
                if mode == CliMode::Interactive {
                    cli_io::print_info("Bye.");
                }
                break;
            }
        }
    }
    tracing::info!("shell stopped");
    Ok(())
}

enum Line {
    Command(String),
    Skip,
    Interrupted,
    End,
}

enum LineSource {
    Editor(Box<Editor<CommandHelper, DefaultHistory>>),
    Script(StdinLock<'static>),
}

impl LineSource {
    fn editor(context: &ShellContext) -> Result<Self, CliError> {
        let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(CommandHelper::from_entries(context.registry.list())));
        editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
        Ok(LineSource::Editor(Box::new(editor)))
    }

    fn read(&mut self, prompt: &str) -> Result<Line, CliError> {
        match self {
            LineSource::Editor(editor) => match editor.readline(prompt) {
                Ok(raw) => {
                    let line = raw.trim();
                    if line.is_empty() {
                        return Ok(Line::Skip);
                    }
                    editor.add_history_entry(line).ok();
                    Ok(Line::Command(line.to_string()))
                }
                Err(ReadlineError::Interrupted) => Ok(Line::Interrupted),
                Err(ReadlineError::Eof) => Ok(Line::End),
                Err(err) => Err(err.into()),
            },
            LineSource::Script(stdin) => {
                let mut raw = String::new();
                if stdin.read_line(&mut raw)? == 0 {
                    return Ok(Line::End);
                }
                let line = raw.trim();
                // Blank lines and `#` comments keep scripts readable.
                if line.is_empty() || line.starts_with('#') {
                    return Ok(Line::Skip);
                }
                Ok(Line::Command(line.to_string()))
            }
        }
    }
}

/// Tokenises and dispatches one command line.
pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            cli_io::print_warning(format!("Could not parse `{}`: {}", line, err));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    context.last_command = Some(line.trim().to_string());
    tracing::debug!(%command, args = args.len(), "shell line");

    let control = context.dispatch(&command, raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, shell_words::ParseError> {
    shell_words::split(input)
}

/// Completes command names and, after a command, its subcommands.
struct CommandHelper {
    commands: BTreeMap<String, Vec<String>>,
}

impl CommandHelper {
    fn from_entries(entries: Vec<&CommandEntry>) -> Self {
        let commands = entries
            .into_iter()
            .map(|entry| {
                let subs = entry.subcommands().into_iter().map(str::to_string).collect();
                (entry.name.to_ascii_lowercase(), subs)
            })
            .collect();
        Self { commands }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<String> {
        let pool: Vec<&String> = match words {
            [] => self.commands.keys().collect(),
            [command] => self
                .commands
                .get(&command.to_ascii_lowercase())
                .map(|subs| subs.iter().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        pool.into_iter()
            .filter(|candidate| candidate.starts_with(needle))
            .cloned()
            .collect()
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let needle = prefix[start..].to_ascii_lowercase();

        let pairs = self
            .candidates(&words, &needle)
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::CommandResult;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    fn helper() -> CommandHelper {
        let entries = [
            CommandEntry::new("member", "", "member [list|new]", noop),
            CommandEntry::new(
                "bootcamp",
                "",
                "bootcamp [list|add <name> <location> <start> <end> <capacity>|register|registrations]",
                noop,
            ),
            CommandEntry::new("exit", "", "exit", noop),
        ];
        CommandHelper::from_entries(entries.iter().collect())
    }

    fn complete(line: &str) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let ctx = ReadlineContext::new(&history);
        let (start, pairs) = helper().complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|pair| pair.replacement).collect())
    }

    #[test]
    fn completes_commands_then_subcommands() {
        assert_eq!(complete("me"), (0, vec!["member".to_string()]));
        assert_eq!(
            complete("member "),
            (7, vec!["list".to_string(), "new".to_string()])
        );
        assert_eq!(
            complete("bootcamp reg"),
            (9, vec!["register".to_string(), "registrations".to_string()])
        );
        assert!(complete("member new x").1.is_empty());
        assert!(complete("exit ").1.is_empty());
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        assert!(parse_command_line("member \"unterminated").is_err());
    }
}
