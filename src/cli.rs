use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Show the current model
    #[arg(long = "model")]
    pub show_model: bool,

    /// Remove the stored API key
    #[arg(long)]
    pub remove_api: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explain a shell command in beginner-friendly terms
    Explain {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Generate a bash script for a task
    GenerateScript {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        description: Vec<String>,
    },

    /// Generate shell commands for a task and run them on approval
    Automate {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        description: Vec<String>,
    },

    /// Suggest fixes for an error message (reads stdin when piped)
    Fix {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        error: Vec<String>,
    },

    /// Show information about this machine
    SystemInfo,

    /// Set the default Gemini model
    SetModel { model: String },

    /// Start the interactive shell (the default)
    Chat,
}
