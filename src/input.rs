use crate::commands::dispatcher::CommandDispatcher;
use crate::core::error::ShellmancerError;
use crate::history::{CommandHistory, MAX_HISTORY_SIZE};

use console::style;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper};
use std::borrow::Cow;

/// What one call to the line editor produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Built-in keywords (plus `exit`) extending what has been typed so far.
fn keyword_candidates(names: &[String], typed: &str) -> Vec<Pair> {
    let typed = typed.to_lowercase();
    if typed.trim().is_empty() {
        return Vec::new();
    }

    names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("exit"))
        .filter(|name| name.len() > typed.len() && name.starts_with(&typed))
        .map(|name| Pair {
            display: name.to_string(),
            replacement: format!("{} ", name),
        })
        .collect()
}

/// Completes built-in keywords at the start of the line, filenames elsewhere
pub struct ShellCompleter {
    filename_completer: FilenameCompleter,
    command_registry: CommandDispatcher,
}

impl ShellCompleter {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self {
            filename_completer: FilenameCompleter::new(),
            command_registry,
        }
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let matches = keyword_candidates(&self.command_registry.get_command_names(), &line[..pos]);
        if !matches.is_empty() {
            return Ok((0, matches));
        }

        self.filename_completer.complete(line, pos, ctx)
    }
}

/// Helper struct that combines all rustyline components
pub struct ShellHelper {
    completer: ShellCompleter,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
}

impl ShellHelper {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self {
            completer: ShellCompleter::new(command_registry),
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter {},
        }
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }

    fn highlight_char(&self, line: &str, pos: usize, kind: CmdKind) -> bool {
        self.highlighter.highlight_char(line, pos, kind)
    }
}

impl Validator for ShellHelper {}

/// Creates a configured rustyline editor primed with the session history
pub fn create_editor(
    command_registry: CommandDispatcher,
    history: &CommandHistory,
) -> Result<Editor<ShellHelper, FileHistory>, ShellmancerError> {
    let config = Config::builder()
        .max_history_size(MAX_HISTORY_SIZE)?
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| ShellmancerError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(ShellHelper::new(command_registry)));

    for entry in history.entries() {
        editor.add_history_entry(entry)?;
    }

    Ok(editor)
}

/// Reads a line of input using rustyline
pub fn read_input(
    editor: &mut Editor<ShellHelper, FileHistory>,
) -> Result<Input, ShellmancerError> {
    let prompt = if cfg!(windows) && std::env::var("PSModulePath").is_ok() {
        "shellmancer> ".to_string()
    } else {
        style("shellmancer> ").bold().green().to_string()
    };

    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor.add_history_entry(line.trim())?;
            }
            Ok(Input::Line(line))
        }
        Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
        Err(ReadlineError::Eof) => Ok(Input::Eof),
        Err(err) => Err(err.into()),
    }
}
