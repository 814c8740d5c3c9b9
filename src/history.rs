use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MAX_HISTORY_SIZE: usize = 1000;

/// Raw input lines, newest last, capped at `max` entries.
///
/// Backed by a plain text file with one line per entry. File problems are
/// logged and otherwise ignored; history is never worth failing over.
#[derive(Debug)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    max: usize,
    path: PathBuf,
}

impl CommandHistory {
    pub fn load(path: PathBuf, max: usize) -> Self {
        let mut history = Self {
            entries: VecDeque::new(),
            max,
            path,
        };

        match fs::read_to_string(&history.path) {
            Ok(contents) => {
                let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
                let skip = lines.len().saturating_sub(max);
                history.entries = lines[skip..].iter().map(|l| l.to_string()).collect();
                debug!(
                    "loaded {} history entries from {}",
                    history.entries.len(),
                    history.path.display()
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not load history {}: {}", history.path.display(), e),
        }

        history
    }

    /// Appends `line` unless it repeats the newest entry. Returns whether it
    /// was added.
    pub fn push(&mut self, line: &str) -> bool {
        if line.trim().is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return false;
        }
        self.entries.push_back(line.to_string());
        while self.entries.len() > self.max {
            self.entries.pop_front();
        }
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Could not create history directory {}: {}", parent.display(), e);
                return;
            }
        }

        let mut contents = self.entries().collect::<Vec<_>>().join("\n");
        contents.push('\n');
        if let Err(e) = fs::write(&self.path, contents) {
            warn!("Could not save history {}: {}", self.path.display(), e);
        }
    }

    pub fn delete(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("deleted history {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not delete history file {}: {}", self.path.display(), e),
        }
    }

    /// End-of-session policy: keep a copy on disk or remove it.
    pub fn finish(&self, keep: bool) {
        if keep {
            self.save();
        } else {
            self.delete();
        }
    }
}
