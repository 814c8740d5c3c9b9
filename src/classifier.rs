use crate::system::Platform;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Where a line typed at the prompt should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Exit,
    Builtin { name: String, args: String },
    OsCommand,
    Query,
}

/// Answers whether a name resolves to an executable on the search path.
#[async_trait]
pub trait CommandLookup: Send + Sync {
    async fn exists(&self, name: &str, cwd: &Path) -> bool;
}

/// Asks `which` / `where`. Found means exit status 0 and some output.
pub struct PathLookup {
    platform: Platform,
}

impl PathLookup {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl CommandLookup for PathLookup {
    async fn exists(&self, name: &str, cwd: &Path) -> bool {
        let output = Command::new(self.platform.lookup_program())
            .arg(name)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => {
                output.status.success() && !String::from_utf8_lossy(&output.stdout).trim().is_empty()
            }
            Err(e) => {
                warn!("{} lookup failed: {}", self.platform.lookup_program(), e);
                false
            }
        }
    }
}

/// Longest built-in keyword that `line` starts with, case-insensitively,
/// followed by end of line or whitespace. Returns the keyword and the
/// trimmed remainder with its original case.
pub fn match_builtin<'a>(line: &'a str, keywords: &[String]) -> Option<(String, &'a str)> {
    let mut candidates: Vec<&String> = keywords.iter().collect();
    candidates.sort_by_key(|kw| std::cmp::Reverse(kw.len()));

    candidates.into_iter().find_map(|kw| {
        let head = line.get(..kw.len())?;
        let rest = &line[kw.len()..];
        let boundary = rest.chars().next().is_none_or(char::is_whitespace);
        (head.eq_ignore_ascii_case(kw) && boundary).then(|| (kw.clone(), rest.trim()))
    })
}

/// Tokens that could never name an executable skip the lookup process.
fn plausible_command_name(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '+' | '~' | ':' | '\\')
        })
}

/// Routes a trimmed, non-empty line: `exit`, then built-ins, then the
/// OS-command lookup of the first token, and finally the model.
pub async fn classify(
    line: &str,
    keywords: &[String],
    lookup: &dyn CommandLookup,
    cwd: &Path,
) -> Route {
    let line = line.trim();

    if line.eq_ignore_ascii_case("exit") {
        return Route::Exit;
    }

    if let Some((name, args)) = match_builtin(line, keywords) {
        return Route::Builtin {
            name,
            args: args.to_string(),
        };
    }

    let first = line.split_whitespace().next().unwrap_or_default();
    if !plausible_command_name(first) {
        debug!("skipping command lookup for {:?}", first);
        return Route::Query;
    }

    if lookup.exists(first, cwd).await {
        Route::OsCommand
    } else {
        Route::Query
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Knows a fixed set of executables and records every name it is asked about.
    pub struct FakeLookup {
        known: HashSet<String>,
        pub looked_up: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        pub fn new(known: &[&str]) -> Self {
            Self {
                known: known.iter().map(|s| s.to_string()).collect(),
                looked_up: Mutex::new(Vec::new()),
            }
        }

        pub fn looked_up(&self) -> Vec<String> {
            self.looked_up.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandLookup for FakeLookup {
        async fn exists(&self, name: &str, _cwd: &Path) -> bool {
            self.looked_up.lock().unwrap().push(name.to_string());
            self.known.contains(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeLookup;
    use super::*;

    fn keywords() -> Vec<String> {
        ["list files", "cd", "automate", "system-info"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn route(line: &str, lookup: &FakeLookup) -> Route {
        classify(line, &keywords(), lookup, Path::new(".")).await
    }

    #[tokio::test]
    async fn exit_is_case_insensitive_and_exact() {
        let lookup = FakeLookup::new(&["exit"]);
        assert_eq!(route("exit", &lookup).await, Route::Exit);
        assert_eq!(route("  ExIt ", &lookup).await, Route::Exit);
        assert_ne!(route("exit now", &lookup).await, Route::Exit);
    }

    #[tokio::test]
    async fn cd_is_builtin_and_never_looked_up() {
        let lookup = FakeLookup::new(&["cd"]);
        assert_eq!(
            route("cd /tmp", &lookup).await,
            Route::Builtin {
                name: "cd".to_string(),
                args: "/tmp".to_string()
            }
        );
        assert!(lookup.looked_up().is_empty());
    }

    #[tokio::test]
    async fn builtin_keyword_ignores_case_but_args_keep_it() {
        let lookup = FakeLookup::new(&[]);
        assert_eq!(
            route("LIST FILES ./Docs", &lookup).await,
            Route::Builtin {
                name: "list files".to_string(),
                args: "./Docs".to_string()
            }
        );
        assert_eq!(
            route("Automate", &lookup).await,
            Route::Builtin {
                name: "automate".to_string(),
                args: String::new()
            }
        );
    }

    #[tokio::test]
    async fn keyword_must_end_at_a_word_boundary() {
        let lookup = FakeLookup::new(&["cdrecord"]);
        assert_eq!(route("cdrecord -v", &lookup).await, Route::OsCommand);
        assert_eq!(route("list filesystems", &lookup).await, Route::Query);
    }

    #[tokio::test]
    async fn resolvable_first_token_is_an_os_command() {
        let lookup = FakeLookup::new(&["ls"]);
        assert_eq!(route("ls -la /etc", &lookup).await, Route::OsCommand);
        assert_eq!(lookup.looked_up(), vec!["ls"]);
    }

    #[tokio::test]
    async fn natural_language_falls_through_to_query() {
        let lookup = FakeLookup::new(&["ls"]);
        assert_eq!(route("what is a pipe in linux", &lookup).await, Route::Query);
        assert_eq!(lookup.looked_up(), vec!["what"]);
    }

    #[tokio::test]
    async fn punctuated_tokens_skip_the_lookup() {
        let lookup = FakeLookup::new(&[]);
        assert_eq!(route("what's a zombie process?", &lookup).await, Route::Query);
        assert_eq!(route("why?", &lookup).await, Route::Query);
        assert!(lookup.looked_up().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn path_lookup_finds_sh_only() {
        let lookup = PathLookup::new(Platform::Posix);
        assert!(lookup.exists("sh", Path::new("/")).await);
        assert!(
            !lookup
                .exists("definitely-not-a-command-7f3a", Path::new("/"))
                .await
        );
    }
}
