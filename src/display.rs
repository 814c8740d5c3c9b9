use crate::core::error::{Result, ShellmancerError};
use console::{Term, measure_text_width, style};
use std::io::{self, Write};
use std::path::Path;
use termimad::MadSkin;
use tracing::warn;

/// Yes/no question gate used before and during batch execution. Ctrl-C at
/// the question is `Err(Interrupted)`, never an answer.
pub trait Confirm: Send {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Asks on the controlling terminal. Unreadable input counts as "no".
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!(
            "{} {} ",
            style(question).bold().cyan(),
            style(hint).dim()
        );
        let _ = io::stdout().flush();

        answer_from(Term::stdout().read_line(), default)
    }
}

fn answer_from(read: io::Result<String>, default: bool) -> Result<bool> {
    match read {
        Ok(answer) => Ok(parse_answer(&answer, default)),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(ShellmancerError::Interrupted),
        Err(e) => {
            warn!("could not read confirmation: {}", e);
            Ok(false)
        }
    }
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

fn box_width() -> usize {
    let terminal_width = Term::stdout().size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), 100).max(50)
}

/// Display a generated command batch in a shell-labelled box
pub fn display_command_batch(commands: &[String], shell_name: &str) {
    let width = box_width();
    let label = format!("┌─ {} ", shell_name);
    let header = label.clone() + &"─".repeat(width.saturating_sub(measure_text_width(&label) + 1)) + "┐";
    let footer = "└".to_string() + &"─".repeat(width.saturating_sub(2)) + "┘";

    println!("\n{}", style("GENERATED COMMANDS").bold().magenta());
    println!("{}", style(&header).dim().green());
    for command in commands {
        let content = format!("$ {}", command);
        let padding = width.saturating_sub(measure_text_width(&content) + 3);
        println!(
            "│ {}{}│",
            style(&content).bold().white(),
            " ".repeat(padding)
        );
    }
    println!("{}", style(&footer).dim().green());
}

/// Numbered plan printed before a single-session run
pub fn display_session_plan(commands: &[String]) {
    println!(
        "\n{}\n",
        style("Executing all commands in a single session...").blue()
    );
    for (index, command) in commands.iter().enumerate() {
        println!("{}", style(format!("{}. {}", index + 1, command)).cyan());
    }
    println!();
}

pub fn display_executing(command: &str) {
    println!("{} {}", style("Executing:").cyan(), style(command).cyan().bold());
}

/// Passes a raw stdout chunk through untouched, partial lines included.
pub fn display_stdout_chunk(text: &str) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

pub fn display_stderr_line(line: &str) {
    eprintln!("{}", style(line).red());
}

pub fn display_command_success() {
    println!("{}\n", style("✓ Command executed successfully").green());
}

pub fn display_command_failure(command: &str, message: &str) {
    println!("{}", style(format!("✗ Command failed: {}", command)).red());
    println!("{}\n", style(format!("  Error: {}", message)).dim());
}

pub fn display_session_success() {
    println!("\n{}\n", style("✓ All commands executed successfully").green());
}

pub fn display_session_warning(hint: &str) {
    println!(
        "\n{}",
        style("⚠ Script execution completed with some errors").yellow()
    );
    println!("{}\n", style(format!("  {}", hint)).dim());
}

/// Display a model reply, rendering markdown when the reply carries any
pub fn display_response(label: &str, response: &str) {
    println!("{}", style(label).bold().blue());
    if response.contains("```") || response.contains('`') || response.contains('#') {
        MadSkin::default().print_text(response);
    } else {
        println!("{}\n", style(response).yellow());
    }
}

pub fn display_no_response() {
    eprintln!("{}", style("No response from Gemini.").red());
}

pub fn display_listing(dir: &Path, entries: &[String]) {
    println!("{}", style(format!("Files in {}:", dir.display())).cyan());
    for entry in entries {
        println!("{}", style(entry).cyan());
    }
}

pub fn display_system_info(rows: &[(&'static str, String)]) {
    println!("{}", style("System Information:").green().bold());
    for (label, value) in rows {
        println!("{:<12} {}", style(format!("{}:", label)).bold(), value);
    }
}

pub fn display_success(message: &str) {
    println!("{}", style(message).green());
}

pub fn display_warning(message: &str) {
    println!("{}", style(message).yellow());
}

pub fn display_error(message: &str) {
    eprintln!("{}", style(message).red());
}

pub fn display_interrupted() {
    display_error("\nshellmancer interrupted through CTRL+C, exiting...");
}
