use std::io;
use thiserror::Error;

/// Unified error type for shellmancer
#[derive(Error, Debug)]
pub enum ShellmancerError {
    /// Model API errors (bad status, empty candidates)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors, including empty required arguments
    #[error("Input error: {0}")]
    Input(String),

    /// A command ran but could not be completed as requested
    #[error("Execution error: {0}")]
    Execution(String),

    /// The shell or binary could not be started at all
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),

    /// The model reply contained nothing runnable
    #[error("No valid commands found to execute")]
    NoValidCommands,

    /// Ctrl-C arrived while work was in flight
    #[error("Interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, ShellmancerError>;

impl From<reqwest::Error> for ShellmancerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShellmancerError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ShellmancerError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            ShellmancerError::Api(format!("API returned error status: {}", err))
        } else {
            ShellmancerError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ShellmancerError {
    fn from(err: serde_json::Error) -> Self {
        ShellmancerError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for ShellmancerError {
    fn from(err: serde_yml::Error) -> Self {
        ShellmancerError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<rustyline::error::ReadlineError> for ShellmancerError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        ShellmancerError::Input(format!("Line editor error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_names_the_command() {
        let err = ShellmancerError::Spawn {
            command: "/no/such/shell".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        let text = err.to_string();
        assert!(text.contains("/no/such/shell"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/here")?)
        }
        assert!(matches!(read(), Err(ShellmancerError::Io { .. })));
    }
}
