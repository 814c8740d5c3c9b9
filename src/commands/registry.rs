use super::SessionState;
use crate::commands::handler::CommandHandler;
use crate::core::error::ShellmancerError;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_lowercase(), Arc::new(command));
    }

    pub async fn execute(
        &self,
        name: &str,
        args: &str,
        state: &mut SessionState,
    ) -> Result<Option<String>, ShellmancerError> {
        let handler = self
            .handlers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| ShellmancerError::Input(format!("Unknown command: {}", name)))?;
        handler.execute(state, args).await
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn help_lines(&self) -> Vec<&'static str> {
        self.handlers.values().map(|h| h.help()).collect()
    }
}
