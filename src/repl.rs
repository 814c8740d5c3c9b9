use crate::classifier::{self, CommandLookup, Route};
use crate::commands::{CommandDispatcher, SessionState};
use crate::core::error::ShellmancerError;
use crate::display;
use crate::executor::{self, CommandOutcome, ExecutionContext};
use crate::history::CommandHistory;
use crate::input::{self, Input};
use crate::providers::{Message, context_prompt};
use console::style;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether the loop should read another line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Terminate,
}

pub struct Repl {
    pub state: SessionState,
    dispatcher: CommandDispatcher,
    lookup: Arc<dyn CommandLookup>,
    history: CommandHistory,
    keep_history: bool,
}

impl Repl {
    pub fn new(
        state: SessionState,
        dispatcher: CommandDispatcher,
        lookup: Arc<dyn CommandLookup>,
        history: CommandHistory,
        keep_history: bool,
    ) -> Self {
        Self {
            state,
            dispatcher,
            lookup,
            history,
            keep_history,
        }
    }

    pub async fn run(mut self) -> Result<(), ShellmancerError> {
        self.print_banner();
        let mut editor = input::create_editor(self.dispatcher.clone(), &self.history)?;

        loop {
            match input::read_input(&mut editor) {
                Ok(Input::Line(line)) => {
                    if self.handle_line(&line).await == Step::Terminate {
                        break;
                    }
                }
                Ok(Input::Interrupted) => {
                    display::display_interrupted();
                    break;
                }
                Ok(Input::Eof) => break,
                Err(e) => {
                    warn!("line editor failed: {}", e);
                    display::display_error(&e.to_string());
                    break;
                }
            }
        }

        self.finish();
        Ok(())
    }

    /// Routes one raw line and acts on it.
    pub async fn handle_line(&mut self, line: &str) -> Step {
        let line = line.trim();
        if line.is_empty() {
            return Step::Continue;
        }
        self.history.push(line);

        let keywords = self.dispatcher.get_command_names();
        let route =
            classifier::classify(line, &keywords, self.lookup.as_ref(), &self.state.cwd).await;
        debug!("{:?} <- {:?}", route, line);

        match route {
            Route::Exit => Step::Terminate,
            Route::Builtin { name, args } => self.run_builtin(&name, &args).await,
            Route::OsCommand => self.run_os_command(line).await,
            Route::Query => self.ask_model(line).await,
        }
    }

    async fn run_builtin(&mut self, name: &str, args: &str) -> Step {
        match self.dispatcher.execute(name, args, &mut self.state).await {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(ShellmancerError::Interrupted) => {
                display::display_interrupted();
                return Step::Terminate;
            }
            Err(e) => display::display_error(&e.to_string()),
        }
        Step::Continue
    }

    async fn run_os_command(&mut self, line: &str) -> Step {
        let ctx = ExecutionContext {
            shell: &self.state.system.shell,
            cwd: &self.state.cwd,
            filter: &self.state.filter,
            interrupt: &self.state.interrupt,
        };

        match executor::run_os_command(line, &ctx).await {
            Ok(CommandOutcome::Success) => {}
            Ok(CommandOutcome::Failure { code, .. }) => {
                let status = code
                    .map(|c| format!("exit code: {}", c))
                    .unwrap_or_else(|| "terminated by signal".to_string());
                display::display_error(&format!("Error executing command ({})", status));
            }
            Err(ShellmancerError::Interrupted) => {
                display::display_interrupted();
                return Step::Terminate;
            }
            Err(e) => display::display_error(&e.to_string()),
        }
        Step::Continue
    }

    async fn ask_model(&mut self, line: &str) -> Step {
        self.state.messages.push(Message::user(line));
        let prompt = context_prompt(&self.state.messages);

        match self.state.provider.get_response(&prompt).await {
            Ok(reply) => {
                display::display_response("Gemini:", &reply);
                self.state.messages.push(Message::assistant(reply));
            }
            Err(e) => {
                warn!("model request failed: {}", e);
                display::display_no_response();
            }
        }
        Step::Continue
    }

    fn print_banner(&self) {
        println!(
            "{} {}",
            style("shellmancer").bold().magenta(),
            style(format!("({})", self.state.provider.model())).dim()
        );
        println!("Entering interactive shell mode. Type 'exit' to quit.");
        for line in self.dispatcher.help_lines() {
            println!("  {}", style(line).dim());
        }
        println!();
    }

    /// Applies the history retention policy and says goodbye.
    pub fn finish(&self) {
        self.history.finish(self.keep_history);
        display::display_warning("Exiting shellmancer interactive mode...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::FakeLookup;
    use crate::commands::create_command_registry;
    use crate::commands::testing::state;
    use crate::core::interrupt::InterruptHandle;
    use crate::display::testing::ScriptedConfirm;
    use crate::providers::Role;
    use crate::providers::testing::ScriptedProvider;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        provider: ScriptedProvider,
        lookup: Arc<FakeLookup>,
        repl: Repl,
    }

    fn fixture(replies: &[&str], known: &[&str], answers: &[bool]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(replies.iter().copied());
        let lookup = Arc::new(FakeLookup::new(known));
        let history = CommandHistory::load(dir.path().join("history"), 1000);
        let cwd = dir.path().canonicalize().unwrap();
        let repl = Repl::new(
            state(&provider, &cwd, answers),
            create_command_registry(),
            lookup.clone(),
            history,
            false,
        );
        Fixture {
            dir,
            provider,
            lookup,
            repl,
        }
    }

    #[tokio::test]
    async fn blank_lines_do_nothing() {
        let mut f = fixture(&[], &[], &[]);
        assert_eq!(f.repl.handle_line("   ").await, Step::Continue);
        assert!(f.lookup.looked_up().is_empty());
        assert!(f.provider.prompts().is_empty());
        assert_eq!(f.repl.history.len(), 0);
    }

    #[tokio::test]
    async fn queries_build_the_conversation() {
        let mut f = fixture(
            &["A pipe connects two processes.", "Use mkfifo."],
            &[],
            &[],
        );

        f.repl.handle_line("what is a pipe in linux").await;
        assert_eq!(f.repl.state.messages.len(), 2);
        assert_eq!(f.repl.state.messages[0].role, Role::User);
        assert_eq!(f.repl.state.messages[1].role, Role::Assistant);
        assert_eq!(f.provider.prompts()[0], "User: what is a pipe in linux");

        f.repl.handle_line("and a named one").await;
        assert_eq!(f.repl.state.messages.len(), 4);
        assert_eq!(
            f.provider.prompts()[1],
            "User: what is a pipe in linux\nAssistant: A pipe connects two processes.\nUser: and a named one"
        );
    }

    #[tokio::test]
    async fn failed_model_call_keeps_only_the_question() {
        let mut f = fixture(&[], &[], &[]);
        assert_eq!(f.repl.handle_line("hello there").await, Step::Continue);
        assert_eq!(f.repl.state.messages, vec![Message::user("hello there")]);
    }

    #[tokio::test]
    async fn cd_updates_cwd_without_lookup_or_model() {
        let mut f = fixture(&[], &["cd"], &[]);
        fs::create_dir(f.dir.path().join("inner")).unwrap();

        f.repl.handle_line("cd inner").await;
        assert_eq!(
            f.repl.state.cwd,
            f.dir.path().join("inner").canonicalize().unwrap()
        );
        assert!(f.lookup.looked_up().is_empty());
        assert!(f.provider.prompts().is_empty());
        assert!(f.repl.state.messages.is_empty());
    }

    #[tokio::test]
    async fn failed_cd_leaves_cwd_alone() {
        let mut f = fixture(&[], &[], &[]);
        let before = f.repl.state.cwd.clone();
        assert_eq!(f.repl.handle_line("cd no/such/dir").await, Step::Continue);
        assert_eq!(f.repl.state.cwd, before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn os_commands_run_in_session_directory() {
        let mut f = fixture(&[], &["touch"], &[]);
        fs::create_dir(f.dir.path().join("inner")).unwrap();

        f.repl.handle_line("cd inner").await;
        f.repl.handle_line("touch made_here").await;

        assert!(f.dir.path().join("inner").join("made_here").exists());
        assert!(f.provider.prompts().is_empty());
        assert!(f.repl.state.messages.is_empty());
    }

    #[tokio::test]
    async fn exit_terminates_and_drops_history() {
        let mut f = fixture(&[], &[], &[]);
        f.repl.handle_line("list files").await;
        f.repl.history.save();
        let path = f.dir.path().join("history");
        assert!(path.exists());

        assert_eq!(f.repl.handle_line("EXIT").await, Step::Terminate);
        f.repl.finish();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupted_os_command_ends_the_session() {
        let mut f = fixture(&[], &["sleep"], &[]);
        let (tx, handle) = InterruptHandle::manual();
        f.repl.state.interrupt = handle;

        let press_ctrl_c = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            tx.send(true).unwrap();
        };

        let (step, ()) = tokio::time::timeout(Duration::from_secs(3), async {
            tokio::join!(f.repl.handle_line("sleep 5"), press_ctrl_c)
        })
        .await
        .expect("interrupt should stop the child");
        assert_eq!(step, Step::Terminate);
    }

    #[tokio::test]
    async fn ctrl_c_during_automate_ends_the_session() {
        let mut f = fixture(&["touch nope"], &[], &[]);
        f.repl.state.confirm = Box::new(ScriptedConfirm::new([]).then_interrupt());

        assert_eq!(f.repl.handle_line("automate make a file").await, Step::Terminate);
        assert!(!f.dir.path().join("nope").exists());
    }

    #[tokio::test]
    async fn builtin_errors_do_not_end_the_session() {
        let mut f = fixture(&[], &[], &[]);
        assert_eq!(
            f.repl.handle_line("list files does-not-exist").await,
            Step::Continue
        );
        assert_eq!(f.repl.handle_line("automate").await, Step::Continue);
        assert!(f.provider.prompts().is_empty());
    }
}
