//! Command-line interface for todo-assistant.
//!
//! The binary parses arguments with clap and hands the result to [`run`],
//! which returns the text to print and the exit code, so every command is
//! testable without spawning a process.

mod assistant;
mod category;
mod config;
mod run;
mod tag;

#[cfg(test)]
mod tests;

pub use assistant::AssistantCommand;
pub use category::CategoryCommand;
pub use config::ConfigCommand;
pub use run::{run, CliOutput};
pub use tag::TagCommand;

use crate::tools::inputs::SearchTasksInput;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Personal task tracker with categories, tags, due dates and an assistant tool surface.
///
/// Dates accept YYYY-MM-DD, YYYY-MM-DD HH:MM, RFC 3339, or one of
/// today, tomorrow, yesterday, next week, next month.
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file (overrides TODO_ASSISTANT_DB and the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file (overrides TODO_ASSISTANT_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task.
    ///
    /// New tasks start as pending with medium priority unless told otherwise.
    /// The category and tags must already exist.
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,

        /// Tag name (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Due date
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks.
    #[command(visible_alias = "ls")]
    List(FilterArgs),

    /// Show one task with its category and tags.
    Show {
        /// Task ID
        id: i64,
    },

    /// Change a task's fields. Only the given fields change.
    ///
    /// Pass an empty string to clear the description, category or due date.
    /// Status is changed only by `start` and `complete`.
    Update {
        /// Task ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// New category name or ID
        #[arg(short, long)]
        category: Option<String>,

        /// New due date
        #[arg(long)]
        due: Option<String>,

        /// Replace all tags with these (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "clear_tags")]
        tags: Option<Vec<String>>,

        /// Remove all tags
        #[arg(long)]
        clear_tags: bool,
    },

    /// Start working on a pending task.
    Start {
        /// Task ID
        id: i64,
    },

    /// Mark a task completed.
    #[command(visible_alias = "done")]
    Complete {
        /// Task ID
        id: i64,
    },

    /// Delete a task permanently.
    #[command(visible_alias = "rm")]
    Delete {
        /// Task ID
        id: i64,
    },

    /// Search tasks by keyword and filters.
    Search {
        /// Text to find in title or description
        keyword: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        ranges: RangeArgs,
    },

    /// Show task statistics.
    Stats {
        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        ranges: RangeArgs,
    },

    /// Category management.
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Tag management.
    #[command(subcommand)]
    Tag(TagCommand),

    /// Export tasks as JSON or CSV.
    Export {
        /// Output format: json, csv (default: from --output extension, else json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave out completed tasks
        #[arg(long)]
        no_completed: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Import tasks from a JSON or CSV export.
    ///
    /// Missing categories and tags are created. The import is all or nothing.
    Import {
        /// File to read
        file: PathBuf,

        /// Input format: json, csv (default: from the file extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Validate and report without writing
        #[arg(long)]
        dry_run: bool,

        /// Skip records whose title already exists
        #[arg(long)]
        skip_existing: bool,
    },

    /// Assistant settings.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Assistant backend and tool information.
    #[command(subcommand)]
    Assistant(AssistantCommand),

    /// Show version information.
    Version,
}

/// Common task filters.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Status: pending, in_progress, completed
    #[arg(short, long)]
    pub status: Option<String>,

    /// Priority: low, medium, high
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Category name or ID
    #[arg(short, long)]
    pub category: Option<String>,

    /// Only tasks without a category
    #[arg(long, conflicts_with = "category")]
    pub no_category: bool,

    /// Required tag (repeatable; all must match)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Only tasks without tags
    #[arg(long)]
    pub no_tags: bool,

    /// Only tasks past due and not completed
    #[arg(long)]
    pub overdue: bool,

    /// Sort by: created, updated, due, priority, title
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse the sort order
    #[arg(short, long)]
    pub reverse: bool,

    /// Maximum number of tasks to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Number of tasks to skip
    #[arg(long)]
    pub offset: Option<usize>,
}

/// Inclusive date bounds.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Created on or after
    #[arg(long)]
    pub created_after: Option<String>,

    /// Created on or before
    #[arg(long)]
    pub created_before: Option<String>,

    /// Due on or after
    #[arg(long)]
    pub due_after: Option<String>,

    /// Due on or before
    #[arg(long)]
    pub due_before: Option<String>,

    /// Completed on or after
    #[arg(long)]
    pub completed_after: Option<String>,

    /// Completed on or before
    #[arg(long)]
    pub completed_before: Option<String>,
}

impl FilterArgs {
    /// Convert to the tool-layer search input, so both surfaces share coercion.
    #[must_use]
    pub fn to_input(&self, keyword: Option<String>, ranges: &RangeArgs) -> SearchTasksInput {
        SearchTasksInput {
            keyword,
            status: self.status.clone(),
            priority: self.priority.clone(),
            category: self.category.clone(),
            no_category: self.no_category,
            tags: self.tags.clone(),
            no_tags: self.no_tags,
            created_after: ranges.created_after.clone(),
            created_before: ranges.created_before.clone(),
            due_after: ranges.due_after.clone(),
            due_before: ranges.due_before.clone(),
            completed_after: ranges.completed_after.clone(),
            completed_before: ranges.completed_before.clone(),
            overdue: self.overdue,
            sort_by: self.sort.clone(),
            reverse: self.reverse,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
