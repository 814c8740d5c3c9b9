use super::{
    SessionState,
    handler::{AutomateCommand, ChangeDirCommand, ListFilesCommand, SystemInfoCommand},
    registry::CommandRegistry,
};
use crate::core::error::ShellmancerError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        command: &str,
        args: &str,
        state: &mut SessionState,
    ) -> Result<Option<String>, ShellmancerError> {
        self.registry.execute(command, args, state).await
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }

    pub fn help_lines(&self) -> Vec<&'static str> {
        self.registry.help_lines()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("list files", ListFilesCommand);
    registry.register("cd", ChangeDirCommand);
    registry.register("automate", AutomateCommand);
    registry.register("system-info", SystemInfoCommand);

    CommandDispatcher::new(Arc::new(registry))
}
