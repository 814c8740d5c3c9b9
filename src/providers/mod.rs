use crate::core::error::ShellmancerError;
use async_trait::async_trait;

pub mod base_client;
pub mod gemini;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn of the conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Flattens the whole transcript, oldest first, into a single prompt.
pub fn context_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Opaque text-completion collaborator.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn get_response(&self, prompt: &str) -> Result<String, ShellmancerError>;

    fn model(&self) -> &str;
}
