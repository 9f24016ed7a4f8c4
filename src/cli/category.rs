//! Category CLI subcommands.

use clap::Subcommand;

/// Category management commands.
///
/// Categories group tasks; each task has at most one. Deleting a category
/// keeps its tasks and leaves them uncategorized.
#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        /// Category name (unique)
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Display color as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// List categories with task counts.
    #[command(visible_alias = "ls")]
    List,

    /// Rename a category or change its description or color.
    Update {
        /// Category name or ID
        category: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New description (empty clears)
        #[arg(short, long)]
        description: Option<String>,

        /// New color as #RRGGBB (empty clears)
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a category. Its tasks become uncategorized.
    #[command(visible_alias = "rm")]
    Delete {
        /// Category name or ID
        category: String,
    },
}
