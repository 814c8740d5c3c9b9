use crate::core::error::{Result, ShellmancerError};
use crate::providers::LLMProvider;
use crate::system::Platform;
use tracing::debug;

const POSIX_AUTOMATION_PROMPT: &str = "Generate a list of shell commands to {task}. \
Output them as plain text, one command per line, with no markdown formatting, numbering or explanations.
Every command that depends on an existing resource (a file, a directory, a Docker container) must be \
wrapped in an existence check instead of being run unconditionally. Examples:
if [ -d /path/to/dir ]; then cd /path/to/dir; else echo \"Directory /path/to/dir does not exist\"; fi
if [ -f /path/to/file ]; then cat /path/to/file; else echo \"File /path/to/file does not exist\"; fi
if docker inspect my-container > /dev/null 2>&1; then docker start my-container; else echo \"Container my-container does not exist\"; fi
Use POSIX shell syntax only. Do not use PowerShell cmdlets.
When files must be created inside a new directory, create the directory, change into it, \
create the files, then change back:
mkdir my_folder
cd my_folder
touch file1.txt
cd ..";

const WINDOWS_AUTOMATION_PROMPT: &str = "Generate a list of PowerShell commands to {task}. \
Output them as plain text, one command per line, with no markdown formatting, numbering or explanations.
You are running in Windows PowerShell: use PowerShell cmdlets such as New-Item, Set-Content, \
Get-Content, Get-ChildItem, Test-Path and Set-Location. Do not use bash or Unix commands such as \
mkdir -p, touch, ls -la, cat or [ -d ].
Every command that depends on an existing resource (a file, a directory, a Docker container) must be \
wrapped in an existence check instead of being run unconditionally. Examples:
if (Test-Path \"my_folder\") { Set-Location \"my_folder\" } else { Write-Host \"Directory my_folder does not exist\" }
if (Test-Path \"file.txt\") { Get-Content \"file.txt\" } else { Write-Host \"File file.txt does not exist\" }
When files must be created inside a new directory, create the directory, change into it, \
create the files, then change back:
New-Item -ItemType Directory -Path \"my_folder\" -Force
Set-Location \"my_folder\"
New-Item -ItemType File -Path \"file1.txt\" -Force
Set-Location \"..\"";

/// Instruction prompt asking the model for guarded commands for `platform`.
pub fn build_prompt(description: &str, platform: Platform) -> String {
    let template = match platform {
        Platform::Posix => POSIX_AUTOMATION_PROMPT,
        Platform::Windows => WINDOWS_AUTOMATION_PROMPT,
    };
    template.replace("{task}", description.trim())
}

/// Splits a reply into commands, dropping blank lines, `#` comments and
/// code-fence markers. Order is preserved.
pub fn parse_batch(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .map(str::to_string)
        .collect()
}

/// A model reply and the commands parsed out of it.
#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    pub raw: String,
    pub commands: Vec<String>,
}

pub async fn generate(
    provider: &dyn LLMProvider,
    description: &str,
    platform: Platform,
) -> Result<GeneratedBatch> {
    if description.trim().is_empty() {
        return Err(ShellmancerError::Input(
            "Please provide a task description for automation.".to_string(),
        ));
    }

    let raw = provider.get_response(&build_prompt(description, platform)).await?;
    let commands = parse_batch(&raw);
    debug!("model produced {} runnable commands", commands.len());

    if commands.is_empty() {
        return Err(ShellmancerError::NoValidCommands);
    }

    Ok(GeneratedBatch { raw, commands })
}
