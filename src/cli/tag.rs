//! Tag CLI subcommands.

use clap::Subcommand;

/// Tag management commands.
///
/// Tags are free labels; a task may carry any number. Deleting a tag removes
/// it from every task but keeps the tasks.
#[derive(Subcommand, Debug, Clone)]
pub enum TagCommand {
    /// Create a tag.
    Add {
        /// Tag name (unique)
        name: String,

        /// Display color as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// List tags with task counts.
    #[command(visible_alias = "ls")]
    List,

    /// Rename a tag or change its color.
    Update {
        /// Current tag name
        tag: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New color as #RRGGBB (empty clears)
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a tag and remove it from all tasks.
    #[command(visible_alias = "rm")]
    Delete {
        /// Tag name
        tag: String,
    },

    /// Attach a tag to a task.
    Attach {
        /// Task ID
        task_id: i64,

        /// Tag name
        tag: String,
    },

    /// Remove a tag from a task.
    Detach {
        /// Task ID
        task_id: i64,

        /// Tag name
        tag: String,
    },
}
