//! Config CLI subcommands.

use clap::Subcommand;
use std::path::PathBuf;

/// Assistant settings stored in the config file.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the config file location and effective settings. Keys are masked.
    Show,

    /// Store settings. Only the given fields change.
    Set {
        /// API key
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL of an OpenAI-compatible endpoint
        #[arg(long)]
        base_url: Option<String>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Preferred backend: dashscope, gemini, openai
        #[arg(long)]
        backend: Option<String>,

        /// Database file
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Clear the stored assistant settings.
    Reset,
}
