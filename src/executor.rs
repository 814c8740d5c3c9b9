//! Runs shell commands for the REPL and for generated batches.
//!
//! Every child gets the session's working directory explicitly and inherits
//! stdin. Output that needs inspecting is piped and surfaced as a stream of
//! [`OutputChunk`]s while the process runs. stdout arrives as raw chunks the
//! moment they are read; stderr arrives as whole lines so it can be filtered.
//! Nothing here runs concurrently: each call awaits its child's exit before
//! returning, even when a background grandchild still holds the pipes.

use crate::config::Config;
use crate::core::error::{Result, ShellmancerError};
use crate::core::interrupt::InterruptHandle;
use crate::display::{self, Confirm};
use crate::system::Shell;
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One shell process for the whole batch, so `cd` carries over.
    SingleSession,
    /// One shell process per command, with a continue prompt after failures.
    PerCommand,
}

/// Denylist for shell diagnostic noise on stderr.
///
/// Each pattern is a regex; a pattern that does not compile is matched as a
/// literal substring instead.
#[derive(Debug, Clone)]
pub struct StderrFilter {
    patterns: Vec<Regex>,
}

impl StderrFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                Regex::new(p)
                    .or_else(|_| Regex::new(&regex::escape(p)))
                    .ok()
            })
            .collect();
        Self { patterns }
    }

    pub fn is_noise(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }

    /// First non-blank line that is not noise, trimmed.
    pub fn first_relevant<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !self.is_noise(line))
    }
}

impl Default for StderrFilter {
    fn default() -> Self {
        Self::new(Config::default().stderr_filters)
    }
}

/// Best human-readable reason for a failed command: the first relevant stderr
/// line, else the first raw stderr line, else the exit code.
pub fn describe_failure(code: Option<i32>, stderr: &str, filter: &StderrFilter) -> String {
    if let Some(line) = filter.first_relevant(stderr) {
        return line.to_string();
    }
    if let Some(line) = stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
        return line.to_string();
    }
    match code {
        Some(code) => format!("Command exited with code {}", code),
        None => "Command was terminated by a signal".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure { code: Option<i32>, message: String },
}

impl CommandOutcome {
    fn from_status(status: ExitStatus, stderr: &str, filter: &StderrFilter) -> Self {
        if status.success() {
            CommandOutcome::Success
        } else {
            CommandOutcome::Failure {
                code: status.code(),
                message: describe_failure(status.code(), stderr, filter),
            }
        }
    }
}

/// Everything a spawn needs from the session.
pub struct ExecutionContext<'a> {
    pub shell: &'a Shell,
    pub cwd: &'a Path,
    pub filter: &'a StderrFilter,
    pub interrupt: &'a InterruptHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

#[derive(Debug, Clone, Copy)]
pub enum Wiring {
    Inherit,
    Capture,
}

impl Wiring {
    fn stdio(self) -> Stdio {
        match self {
            Wiring::Inherit => Stdio::inherit(),
            Wiring::Capture => Stdio::piped(),
        }
    }
}

/// How long to keep reading buffered output after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Length of the longest prefix of `bytes` that does not end inside a
/// multi-byte UTF-8 sequence.
fn complete_utf8_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => bytes.len(),
    }
}

/// Raw stdout chunks, passed on as soon as they are read.
fn chunk_stream<R>(reader: R) -> BoxStream<'static, OutputChunk>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold((reader, Vec::new()), |(mut reader, mut pending)| async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => {
                    if pending.is_empty() {
                        return None;
                    }
                    let text = String::from_utf8_lossy(&pending).into_owned();
                    return Some((OutputChunk::Stdout(text), (reader, Vec::new())));
                }
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let complete = complete_utf8_len(&pending);
                    if complete == 0 {
                        continue;
                    }
                    let rest = pending.split_off(complete);
                    let text = String::from_utf8_lossy(&pending).into_owned();
                    return Some((OutputChunk::Stdout(text), (reader, rest)));
                }
            }
        }
    })
    .boxed()
}

fn line_stream<R>(reader: R, wrap: fn(String) -> OutputChunk) -> BoxStream<'static, OutputChunk>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(BufReader::new(reader), move |mut reader| async move {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                Some((wrap(line), reader))
            }
        }
    })
    .boxed()
}

/// A spawned shell plus the merged stream of its captured output lines.
pub struct RunningCommand {
    child: Child,
    output: BoxStream<'static, OutputChunk>,
}

impl RunningCommand {
    pub fn spawn(
        shell: &Shell,
        body: &str,
        cwd: &Path,
        stdout: Wiring,
        stderr: Wiring,
    ) -> Result<Self> {
        debug!("spawning {} in {}: {}", shell.path, cwd.display(), body);

        let mut child = Command::new(&shell.path)
            .args(shell.script_args(body))
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ShellmancerError::Spawn {
                command: shell.path.clone(),
                source,
            })?;

        let out = child.stdout.take().map(chunk_stream);
        let err = child
            .stderr
            .take()
            .map(|pipe| line_stream(pipe, OutputChunk::Stderr));

        let output = match (out, err) {
            (Some(out), Some(err)) => stream::select(out, err).boxed(),
            (Some(out), None) => out,
            (None, Some(err)) => err,
            (None, None) => stream::empty().boxed(),
        };

        Ok(Self { child, output })
    }

    /// Feeds output to `on_chunk` until the child exits, then drains what
    /// is already buffered for at most [`DRAIN_GRACE`]. Pipes held open by
    /// background grandchildren do not delay the result. Ctrl-C kills the
    /// child and yields `Interrupted`.
    pub async fn run<F>(mut self, interrupt: &InterruptHandle, mut on_chunk: F) -> Result<ExitStatus>
    where
        F: FnMut(OutputChunk),
    {
        let _busy = interrupt.busy();
        let mut interrupt = interrupt.clone();
        let mut output_closed = false;

        let exited = loop {
            tokio::select! {
                chunk = self.output.next(), if !output_closed => match chunk {
                    Some(chunk) => on_chunk(chunk),
                    None => output_closed = true,
                },
                status = self.child.wait() => break Some(status?),
                _ = interrupt.interrupted() => break None,
            }
        };
        let Some(status) = exited else {
            return self.abort().await;
        };

        if !output_closed {
            let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
            while let Ok(Some(chunk)) = tokio::time::timeout_at(deadline, self.output.next()).await {
                on_chunk(chunk);
            }
        }
        Ok(status)
    }

    async fn abort(mut self) -> Result<ExitStatus> {
        warn!("interrupt received, killing child {:?}", self.child.id());
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill child process: {}", e);
        }
        Err(ShellmancerError::Interrupted)
    }
}

/// Joins a batch into one script body; `;` keeps going after failures. A
/// command already ending in `&` or `;` is terminated, so it only gets a space.
pub fn session_script(commands: &[String]) -> String {
    let mut script = String::new();
    for command in commands {
        if !script.is_empty() {
            let terminated = script.ends_with('&') || script.ends_with(';');
            script.push_str(if terminated { " " } else { "; " });
        }
        script.push_str(command.trim_end());
    }
    script
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub code: Option<i32>,
    /// Most relevant stderr line when the script exited non-zero.
    pub hint: Option<String>,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the whole batch in one shell process. A non-zero exit is reported as
/// a warning, since every command was still attempted.
pub async fn run_session(commands: &[String], ctx: &ExecutionContext<'_>) -> Result<SessionReport> {
    let script = session_script(commands);
    display::display_session_plan(commands);

    let running = RunningCommand::spawn(ctx.shell, &script, ctx.cwd, Wiring::Capture, Wiring::Capture)?;
    let mut stderr_text = String::new();
    let status = running
        .run(ctx.interrupt, |chunk| match chunk {
            OutputChunk::Stdout(text) => display::display_stdout_chunk(&text),
            OutputChunk::Stderr(line) => {
                if !line.trim().is_empty() && !ctx.filter.is_noise(&line) {
                    display::display_stderr_line(&line);
                }
                stderr_text.push_str(&line);
                stderr_text.push('\n');
            }
        })
        .await?;

    let report = if status.success() {
        display::display_session_success();
        SessionReport {
            code: status.code(),
            hint: None,
        }
    } else {
        let hint = ctx
            .filter
            .first_relevant(&stderr_text)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Some commands may have failed (exit code: {})",
                    status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                )
            });
        display::display_session_warning(&hint);
        SessionReport {
            code: status.code(),
            hint: Some(hint),
        }
    };

    Ok(report)
}

/// Runs one command in its own shell with stdout passed through and stderr
/// captured for the failure message.
pub async fn run_isolated(command: &str, ctx: &ExecutionContext<'_>) -> Result<CommandOutcome> {
    let running = RunningCommand::spawn(ctx.shell, command, ctx.cwd, Wiring::Inherit, Wiring::Capture)?;
    let mut stderr_text = String::new();
    let status = running
        .run(ctx.interrupt, |chunk| {
            if let OutputChunk::Stderr(line) = chunk {
                stderr_text.push_str(&line);
                stderr_text.push('\n');
            }
        })
        .await?;

    Ok(CommandOutcome::from_status(status, &stderr_text, ctx.filter))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub executed: usize,
    pub failed: usize,
    pub stopped_early: bool,
}

/// Runs each command in isolation, in order. After a failure with commands
/// still pending, `confirm` decides whether to go on; a refusal stops the
/// batch before anything else is spawned, and Ctrl-C at the question unwinds
/// with `Interrupted`.
pub async fn run_per_command(
    commands: &[String],
    ctx: &ExecutionContext<'_>,
    confirm: &mut dyn Confirm,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for (index, command) in commands.iter().enumerate() {
        display::display_executing(command);
        let outcome = run_isolated(command, ctx).await?;
        report.executed += 1;

        match outcome {
            CommandOutcome::Success => display::display_command_success(),
            CommandOutcome::Failure { message, .. } => {
                display::display_command_failure(command, &message);
                report.failed += 1;

                let remaining = commands.len() - index - 1;
                if remaining > 0
                    && !confirm.confirm("Do you want to continue executing the next commands?", true)?
                {
                    display::display_warning("Stopping execution...");
                    report.stopped_early = true;
                    break;
                }
            }
        }
    }

    Ok(report)
}

/// Runs a line typed at the prompt verbatim. stdin and stdout pass straight
/// through so interactive programs behave; stderr is echoed in red.
pub async fn run_os_command(line: &str, ctx: &ExecutionContext<'_>) -> Result<CommandOutcome> {
    let running = RunningCommand::spawn(ctx.shell, line, ctx.cwd, Wiring::Inherit, Wiring::Capture)?;
    let mut stderr_text = String::new();
    let status = running
        .run(ctx.interrupt, |chunk| {
            if let OutputChunk::Stderr(line) = chunk {
                display::display_stderr_line(&line);
                stderr_text.push_str(&line);
                stderr_text.push('\n');
            }
        })
        .await?;

    Ok(CommandOutcome::from_status(status, &stderr_text, ctx.filter))
}
