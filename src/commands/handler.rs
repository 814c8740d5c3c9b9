use super::SessionState;
use crate::core::error::ShellmancerError;
use crate::display;
use crate::executor::{self, ExecutionContext, ExecutionMode};
use crate::generator;
use async_trait::async_trait;
use console::style;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        state: &mut SessionState,
        args: &str,
    ) -> Result<Option<String>, ShellmancerError>;

    fn help(&self) -> &'static str;
}

pub struct ListFilesCommand;
pub struct ChangeDirCommand;
pub struct AutomateCommand;
pub struct SystemInfoCommand;

/// Resolves a user-supplied path against the session directory, expanding a
/// leading `~`.
fn resolve_path(cwd: &Path, arg: &str) -> PathBuf {
    let arg = arg.trim();
    let expanded = match (arg.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        _ => PathBuf::from(arg),
    };
    cwd.join(expanded)
}

/// Entry names of `dir`, sorted.
pub fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[async_trait]
impl CommandHandler for ListFilesCommand {
    async fn execute(
        &self,
        state: &mut SessionState,
        args: &str,
    ) -> Result<Option<String>, ShellmancerError> {
        let dir = if args.trim().is_empty() {
            state.cwd.clone()
        } else {
            resolve_path(&state.cwd, args)
        };

        let entries = list_dir(&dir).map_err(|e| {
            ShellmancerError::Execution(format!("Error listing files in {}: {}", dir.display(), e))
        })?;

        display::display_listing(&dir, &entries);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "list files [dir] - List the entries of a directory"
    }
}

#[async_trait]
impl CommandHandler for ChangeDirCommand {
    async fn execute(
        &self,
        state: &mut SessionState,
        args: &str,
    ) -> Result<Option<String>, ShellmancerError> {
        let target = if args.trim().is_empty() {
            dirs::home_dir().ok_or_else(|| {
                ShellmancerError::Execution("Could not determine home directory".to_string())
            })?
        } else {
            resolve_path(&state.cwd, args)
        };

        let resolved = target.canonicalize().map_err(|e| {
            ShellmancerError::Execution(format!(
                "Error changing directory to {}: {}",
                target.display(),
                e
            ))
        })?;
        if !resolved.is_dir() {
            return Err(ShellmancerError::Execution(format!(
                "Error changing directory to {}: not a directory",
                target.display()
            )));
        }

        debug!("session directory {} -> {}", state.cwd.display(), resolved.display());
        state.cwd = resolved;
        Ok(Some(
            style(format!("Changed directory to {}", state.cwd.display()))
                .green()
                .to_string(),
        ))
    }

    fn help(&self) -> &'static str {
        "cd [dir] - Change the session directory (home when omitted)"
    }
}

#[async_trait]
impl CommandHandler for AutomateCommand {
    async fn execute(
        &self,
        state: &mut SessionState,
        args: &str,
    ) -> Result<Option<String>, ShellmancerError> {
        if args.trim().is_empty() {
            return Err(ShellmancerError::Input(
                "Please provide a task description for automation.".to_string(),
            ));
        }

        display::display_warning("Generating automation commands...");
        let batch = generator::generate(state.provider.as_ref(), args, state.system.platform).await?;

        let shell = state.system.automation_shell();
        display::display_response("Automation Commands:", &batch.raw);
        display::display_command_batch(&batch.commands, &shell.name());

        if !state
            .confirm
            .confirm("Do you want to execute these commands?", false)?
        {
            return Ok(Some(style("Execution cancelled.").yellow().to_string()));
        }

        let mode = if state.confirm.confirm(
            "Execute all commands in a single session? (keeps directory changes)",
            true,
        )? {
            ExecutionMode::SingleSession
        } else {
            ExecutionMode::PerCommand
        };
        info!("running {} commands ({:?})", batch.commands.len(), mode);

        let ctx = ExecutionContext {
            shell: &shell,
            cwd: &state.cwd,
            filter: &state.filter,
            interrupt: &state.interrupt,
        };

        match mode {
            ExecutionMode::SingleSession => {
                let report = executor::run_session(&batch.commands, &ctx).await?;
                if !report.succeeded() {
                    debug!("session exited with {:?}", report.code);
                }
            }
            ExecutionMode::PerCommand => {
                let report =
                    executor::run_per_command(&batch.commands, &ctx, state.confirm.as_mut()).await?;
                debug!("per-command batch finished: {:?}", report);
            }
        }

        Ok(None)
    }

    fn help(&self) -> &'static str {
        "automate <task> - Generate shell commands for a task and run them on approval"
    }
}

#[async_trait]
impl CommandHandler for SystemInfoCommand {
    async fn execute(
        &self,
        state: &mut SessionState,
        _args: &str,
    ) -> Result<Option<String>, ShellmancerError> {
        display::display_system_info(&state.system.report(&state.cwd));
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "system-info - Show details about this machine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::state;
    use crate::display::testing::ScriptedConfirm;
    use crate::providers::testing::ScriptedProvider;
    use tempfile::TempDir;

    #[test]
    fn list_dir_is_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        assert_eq!(list_dir(dir.path()).unwrap(), vec!["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn relative_paths_resolve_against_session_directory() {
        let cwd = Path::new("/srv/work");
        assert_eq!(resolve_path(cwd, "logs"), PathBuf::from("/srv/work/logs"));
        assert_eq!(resolve_path(cwd, "/etc"), PathBuf::from("/etc"));
    }

    #[tokio::test]
    async fn list_files_reports_os_error() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::default();
        let mut state = state(&provider, dir.path(), &[]);

        let err = ListFilesCommand
            .execute(&mut state, "missing")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Error listing files in"));
        assert!(message.contains("missing"));
    }

    #[tokio::test]
    async fn cd_moves_session_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let provider = ScriptedProvider::default();
        let mut state = state(&provider, dir.path(), &[]);

        ChangeDirCommand.execute(&mut state, "sub").await.unwrap();
        assert_eq!(state.cwd, dir.path().join("sub").canonicalize().unwrap());

        ChangeDirCommand.execute(&mut state, "..").await.unwrap();
        assert_eq!(state.cwd, dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn cd_rejects_missing_and_file_targets() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plain.txt"), "").unwrap();
        let provider = ScriptedProvider::default();
        let mut state = state(&provider, dir.path(), &[]);
        let before = state.cwd.clone();

        assert!(ChangeDirCommand.execute(&mut state, "nowhere").await.is_err());
        assert!(ChangeDirCommand.execute(&mut state, "plain.txt").await.is_err());
        assert_eq!(state.cwd, before);
    }

    #[tokio::test]
    async fn automate_requires_a_description() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["echo hi"]);
        let mut state = state(&provider, dir.path(), &[]);

        let result = AutomateCommand.execute(&mut state, "  ").await;
        assert!(matches!(result, Err(ShellmancerError::Input(_))));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn declined_batch_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["touch should_not_exist"]);
        let mut state = state(&provider, dir.path(), &[false]);

        AutomateCommand
            .execute(&mut state, "make a file")
            .await
            .unwrap();
        assert!(!dir.path().join("should_not_exist").exists());
    }

    #[tokio::test]
    async fn ctrl_c_at_approval_is_not_a_decline() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["touch should_not_exist"]);
        let mut state = state(&provider, dir.path(), &[]);
        state.confirm = Box::new(ScriptedConfirm::new([]).then_interrupt());

        let result = AutomateCommand.execute(&mut state, "make a file").await;
        assert!(matches!(result, Err(ShellmancerError::Interrupted)));
        assert!(!dir.path().join("should_not_exist").exists());
    }

    #[tokio::test]
    async fn empty_batch_is_reported() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["```\n# nothing\n```"]);
        let mut state = state(&provider, dir.path(), &[true]);

        let result = AutomateCommand.execute(&mut state, "do nothing").await;
        assert!(matches!(result, Err(ShellmancerError::NoValidCommands)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn single_session_keeps_directory_changes() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["mkdir proj\ncd proj\ntouch notes.txt"]);
        let mut state = state(&provider, dir.path(), &[true, true]);

        AutomateCommand
            .execute(&mut state, "create a project folder")
            .await
            .unwrap();
        assert!(dir.path().join("proj").join("notes.txt").exists());
        assert_eq!(state.cwd, dir.path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn per_command_mode_isolates_directory_changes() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(["mkdir proj\ncd proj\ntouch notes.txt"]);
        let mut state = state(&provider, dir.path(), &[true, false]);

        AutomateCommand
            .execute(&mut state, "create a project folder")
            .await
            .unwrap();
        assert!(dir.path().join("proj").is_dir());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("proj").join("notes.txt").exists());
    }
}
