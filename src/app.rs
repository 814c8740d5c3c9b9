use crate::classifier::PathLookup;
use crate::cli::{Args, Commands};
use crate::commands::{SessionState, create_command_registry};
use crate::config::{API_KEY_ENV, Config};
use crate::core::error::ShellmancerError;
use crate::core::interrupt::InterruptHandle;
use crate::display::{self, TerminalConfirm};
use crate::executor::StderrFilter;
use crate::history::{CommandHistory, MAX_HISTORY_SIZE};
use crate::providers::{LLMProvider, gemini::GeminiProvider};
use crate::repl::Repl;
use crate::system::SystemInfo;
use console::{Term, style};
use is_terminal::IsTerminal;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Application {
    pub args: Args,
    pub config: Config,
}

impl Application {
    pub fn new(args: Args, config: Config) -> Self {
        Self { args, config }
    }

    pub async fn run(mut self) -> Result<(), ShellmancerError> {
        if self.args.show_model {
            println!("Current model: {}", style(self.config.model()).green());
            return Ok(());
        }

        if self.args.remove_api {
            return self.remove_api_key();
        }

        match self.args.command.take() {
            Some(Commands::Explain { command }) => {
                let command = command.join(" ");
                if command.trim().is_empty() {
                    display::display_error("Please provide a command to explain.");
                    return Ok(());
                }
                self.one_shot(&EXPLAIN_PROMPT.replace("{command}", &command), "Explanation:")
                    .await
            }
            Some(Commands::GenerateScript { description }) => {
                let description = description.join(" ");
                if description.trim().is_empty() {
                    display::display_error("Please provide a description of the script.");
                    return Ok(());
                }
                self.one_shot(
                    &GENERATE_SCRIPT_PROMPT.replace("{task}", &description),
                    "Generated Script:",
                )
                .await
            }
            Some(Commands::Fix { error }) => {
                let error = match error.join(" ") {
                    e if e.trim().is_empty() => read_piped_stdin()?,
                    e => e,
                };
                if error.trim().is_empty() {
                    display::display_error("Please provide an error message to fix.");
                    return Ok(());
                }
                self.one_shot(&FIX_PROMPT.replace("{error}", error.trim()), "Suggested Fix:")
                    .await
            }
            Some(Commands::Automate { description }) => {
                self.handle_automate(&description.join(" ")).await
            }
            Some(Commands::SystemInfo) => {
                let cwd = std::env::current_dir()?;
                display::display_system_info(&SystemInfo::new().report(&cwd));
                Ok(())
            }
            Some(Commands::SetModel { model }) => self.set_model(&model),
            Some(Commands::Chat) | None => self.handle_interactive_mode().await,
        }
    }

    fn remove_api_key(&self) -> Result<(), ShellmancerError> {
        if self.config.api_key.is_none() {
            display::display_warning("No API Key found to remove.");
            return Ok(());
        }
        self.config.clone().without_api_key().save()?;
        display::display_success("API Key removed successfully!");
        Ok(())
    }

    fn set_model(&self, model: &str) -> Result<(), ShellmancerError> {
        let model = model.trim();
        if model.is_empty() {
            display::display_error("Please provide a model name.");
            return Ok(());
        }
        self.config.clone().with_model(model).save()?;
        display::display_success(&format!("Default model set to {}", model));
        Ok(())
    }

    fn provider(&self) -> Result<Box<dyn LLMProvider>, ShellmancerError> {
        let api_key = match self.config.api_key() {
            Some(key) => key,
            None => self.ask_for_api_key()?,
        };
        Ok(Box::new(GeminiProvider::from_config(&self.config, api_key)))
    }

    fn ask_for_api_key(&self) -> Result<String, ShellmancerError> {
        if !io::stdin().is_terminal() {
            return Err(ShellmancerError::Config(format!(
                "No API key configured. Set {} or run shellmancer interactively.",
                API_KEY_ENV
            )));
        }

        println!(
            "{} {}",
            style("You can get your API key from:").blue(),
            style("https://aistudio.google.com/apikey").underlined().blue()
        );
        let term = Term::stdout();
        term.write_str("Enter your Gemini API Key (will be stored on your machine): ")?;
        let key = term.read_secure_line()?.trim().to_string();
        if key.is_empty() {
            return Err(ShellmancerError::Input("API key cannot be empty".to_string()));
        }

        self.config.clone().with_api_key(&key).save()?;
        display::display_success("API Key saved successfully!");
        Ok(key)
    }

    async fn one_shot(&self, prompt: &str, label: &str) -> Result<(), ShellmancerError> {
        let provider = self.provider()?;
        debug!("one-shot request to {}", provider.model());

        match provider.get_response(prompt).await {
            Ok(reply) => display::display_response(label, &reply),
            Err(e) => {
                warn!("model request failed: {}", e);
                display::display_no_response();
            }
        }
        Ok(())
    }

    fn session_state(&self, interrupt: InterruptHandle) -> Result<SessionState, ShellmancerError> {
        Ok(SessionState::new(
            self.provider()?,
            SystemInfo::new(),
            std::env::current_dir()?,
            StderrFilter::new(&self.config.stderr_filters),
            interrupt,
            Box::new(TerminalConfirm),
        ))
    }

    async fn handle_automate(&self, description: &str) -> Result<(), ShellmancerError> {
        if description.trim().is_empty() {
            display::display_error("Please provide a task description for automation.");
            return Ok(());
        }

        let mut state = self.session_state(install_interrupt(None))?;
        match create_command_registry()
            .execute("automate", description, &mut state)
            .await
        {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(ShellmancerError::Interrupted) => display::display_interrupted(),
            Err(e) => display::display_error(&e.to_string()),
        }
        Ok(())
    }

    async fn handle_interactive_mode(&self) -> Result<(), ShellmancerError> {
        let history = CommandHistory::load(Config::history_path(), MAX_HISTORY_SIZE);
        let history_to_drop = (!self.config.keep_history).then(|| history.path().to_path_buf());
        let state = self.session_state(install_interrupt(history_to_drop))?;

        info!(
            "interactive session in {} using {} ({} history entries)",
            state.cwd.display(),
            state.system.shell.path,
            history.len()
        );
        let lookup = Arc::new(PathLookup::new(state.system.platform));
        let repl = Repl::new(
            state,
            create_command_registry(),
            lookup,
            history,
            self.config.keep_history,
        );
        repl.run().await
    }
}

/// Ctrl-C outside a running child ends the process after removing the
/// history file, if any.
fn install_interrupt(history_to_drop: Option<PathBuf>) -> InterruptHandle {
    InterruptHandle::install(move || {
        display::display_interrupted();
        if let Some(path) = &history_to_drop {
            if let Err(e) = std::fs::remove_file(path) {
                debug!("history cleanup skipped: {}", e);
            }
        }
        std::process::exit(0);
    })
}

fn read_piped_stdin() -> Result<String, ShellmancerError> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }

    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|e| ShellmancerError::Input(format!("Failed to read from stdin: {}", e)))?;
    Ok(buffer)
}

const EXPLAIN_PROMPT: &str = "You are a command line assistant that explains shell commands.
Explain the shell command \"{command}\" in simple, beginner-friendly terms.
If the text is not a shell command, answer it briefly and point out that it is unrelated to shell commands.
Skip any preamble and go straight to the explanation.
Do not use markdown formatting; the answer is printed in a terminal.";

const GENERATE_SCRIPT_PROMPT: &str = "Generate a bash script to {task}.
Output only the script, ready to copy, with no introduction or closing remarks.
Start the script with comments describing what it does and how risky it is to run.";

const FIX_PROMPT: &str = "My terminal printed the following error:

\"{error}\"

Suggest possible fixes, explain what is likely causing it and give actionable steps.
Do not use markdown, XML or HTML in the answer.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_their_placeholders() {
        assert!(EXPLAIN_PROMPT.contains("{command}"));
        assert!(GENERATE_SCRIPT_PROMPT.contains("{task}"));
        assert!(FIX_PROMPT.contains("{error}"));

        let explain = EXPLAIN_PROMPT.replace("{command}", "tar -xzf a.tgz");
        assert!(explain.contains("\"tar -xzf a.tgz\""));
    }
}
