pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::core::interrupt::InterruptHandle;
use crate::display::Confirm;
use crate::executor::StderrFilter;
use crate::providers::{LLMProvider, Message};
use crate::system::SystemInfo;
use std::path::PathBuf;

pub use dispatcher::{CommandDispatcher, create_command_registry};

/// Everything a session owns: the conversation, the model collaborator and
/// the working directory every spawned command runs in.
pub struct SessionState {
    pub messages: Vec<Message>,
    pub provider: Box<dyn LLMProvider>,
    pub system: SystemInfo,
    pub cwd: PathBuf,
    pub filter: StderrFilter,
    pub interrupt: InterruptHandle,
    pub confirm: Box<dyn Confirm>,
}

impl SessionState {
    pub fn new(
        provider: Box<dyn LLMProvider>,
        system: SystemInfo,
        cwd: PathBuf,
        filter: StderrFilter,
        interrupt: InterruptHandle,
        confirm: Box<dyn Confirm>,
    ) -> Self {
        Self {
            messages: Vec::new(),
            provider,
            system,
            cwd,
            filter,
            interrupt,
            confirm,
        }
    }
}
