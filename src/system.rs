use std::env;
use std::path::Path;

/// Target family for generated scripts and command lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// The OS facility that resolves a name on the search path.
    pub fn lookup_program(&self) -> &'static str {
        match self {
            Platform::Posix => "which",
            Platform::Windows => "where",
        }
    }
}

/// Represents different shell types with their specific command arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Cmd,        // Windows Command Prompt
    PowerShell, // Windows PowerShell or PowerShell Core
    UnixLike,   // Bash, Zsh, Sh, etc.
    Fish,       // Fish shell
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub path: String,
    pub kind: ShellType,
}

impl Shell {
    pub fn new(path: impl Into<String>, kind: ShellType) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Argument vector that makes this shell run `body` as one script.
    pub fn script_args(&self, body: &str) -> Vec<String> {
        let mut args: Vec<String> = match self.kind {
            ShellType::Cmd => vec!["/C".into()],
            ShellType::PowerShell => vec!["-NoProfile".into(), "-Command".into()],
            ShellType::UnixLike | ShellType::Fish => vec!["-c".into()],
        };
        args.push(body.to_string());
        args
    }

    /// Shell used for generated batches. The existence guards in generated
    /// POSIX scripts are Bourne syntax, so fish falls back to bash.
    pub fn for_automation(platform: Platform, user_shell: &Shell) -> Shell {
        match platform {
            Platform::Windows => Shell::new("powershell.exe", ShellType::PowerShell),
            Platform::Posix if user_shell.kind == ShellType::UnixLike => user_shell.clone(),
            Platform::Posix => Shell::new("/bin/bash", ShellType::UnixLike),
        }
    }

    pub fn name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("sh")
            .to_lowercase()
    }
}

/// Holds information about the current system environment
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os_info: String,
    pub platform: Platform,
    pub shell: Shell,
}

impl SystemInfo {
    /// Detects the current system environment and returns a `SystemInfo` struct.
    pub fn new() -> Self {
        let os_info_val = os_info::get();
        let os_info = format!(
            "{} {} {}",
            os_info_val.os_type(),
            os_info_val.version(),
            os_info_val.bitness()
        );

        SystemInfo {
            os_info,
            platform: Platform::current(),
            shell: detect_shell(),
        }
    }

    pub fn automation_shell(&self) -> Shell {
        Shell::for_automation(self.platform, &self.shell)
    }

    /// Label/value rows for the `system-info` directive.
    pub fn report(&self, cwd: &Path) -> Vec<(&'static str, String)> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        vec![
            ("OS", self.os_info.clone()),
            ("Arch", env::consts::ARCH.to_string()),
            ("Family", env::consts::FAMILY.to_string()),
            ("Shell", self.shell.path.clone()),
            ("CPU(s)", cpus),
            ("Working dir", cwd.display().to_string()),
        ]
    }
}

/// Detects the current shell environment.
fn detect_shell() -> Shell {
    if cfg!(target_os = "windows") {
        // On Windows, check for PowerShell first, then cmd
        if env::var("PSModulePath").is_ok() {
            if let Ok(posh_path) = env::var("POSH_EXECUTABLE") {
                if Path::new(&posh_path).exists() {
                    return Shell::new(posh_path, ShellType::PowerShell);
                }
            }
            return Shell::new("powershell.exe", ShellType::PowerShell);
        }
        Shell::new(
            env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string()),
            ShellType::Cmd,
        )
    } else {
        let shell_path = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        let kind = if Shell::new(shell_path.as_str(), ShellType::UnixLike).name() == "fish" {
            ShellType::Fish
        } else {
            ShellType::UnixLike
        };
        Shell::new(shell_path, kind)
    }
}
