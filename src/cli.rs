use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Parser)]
#[command(
    name = "studyx",
    about = "Turn videos, documents, and notes into study material",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Credential for the completion API
    #[arg(long, env = "STUDYX_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Config file (default: ~/.config/studyx/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Completion model, overrides the config file
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Output format: text (default), json, markdown
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Show transcript providers and progress on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build study material from a YouTube video's captions
    Video {
        /// YouTube video URL or video ID
        url: String,
    },

    /// Build study material from pasted text (reads stdin if FILE is omitted or `-`)
    Text {
        file: Option<PathBuf>,
    },

    /// Build study material from a PDF document
    Document {
        path: PathBuf,
    },

    /// Ask a question about study material
    Chat {
        /// The question to answer
        question: String,

        /// File holding the full study material
        #[arg(short, long)]
        material: Option<PathBuf>,

        /// Short context used when no material file is given
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Print a video's transcript without generating anything
    Transcript {
        /// YouTube video URL or video ID
        url: String,
    },

    /// Run the HTTP API
    Serve {
        /// Listen address, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,
    },
}
