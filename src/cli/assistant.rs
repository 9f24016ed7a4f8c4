//! Assistant CLI subcommands.

use clap::Subcommand;

/// Assistant backend and tool information.
///
/// Backends are chosen automatically in the order DashScope, Gemini, OpenAI
/// from whichever API keys are set, unless one is requested explicitly.
#[derive(Subcommand, Debug, Clone)]
pub enum AssistantCommand {
    /// List backends in priority order with key availability.
    Backends,

    /// Show which backend and model would be used.
    Select {
        /// Request a backend: dashscope, gemini, openai
        #[arg(long)]
        backend: Option<String>,

        /// Use this API key for an OpenAI-compatible endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// Use this base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Use this model
        #[arg(long)]
        model: Option<String>,
    },

    /// List the tools exposed to the assistant.
    Tools {
        /// Only tools of this domain: task, category, tag (repeatable)
        #[arg(short, long = "domain")]
        domains: Vec<String>,
    },
}
