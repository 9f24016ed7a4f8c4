//! Argument schemas for the tool catalog.
//!
//! Dates, priorities and statuses arrive as strings and are coerced by the
//! handlers before anything reaches the service.

use schemars::JsonSchema;
use serde::Deserialize;

/// Input for tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoInput {}

/// Input for tools that act on one task.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskIdInput {
    /// Task ID.
    pub task_id: i64,
}

/// Input for creating a task.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddTaskInput {
    /// Task title (required).
    pub title: String,
    /// Task description (optional).
    pub description: Option<String>,
    /// Priority: low, medium (default), or high.
    pub priority: Option<String>,
    /// Existing category, by name or ID (optional).
    pub category: Option<String>,
    /// Names of existing tags (optional).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Due date: YYYY-MM-DD, YYYY-MM-DD HH:MM, or today/tomorrow/next week (optional).
    pub due_date: Option<String>,
}

/// Input for listing tasks with the common filters.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListTasksInput {
    /// Filter by status: pending, in_progress, completed (optional).
    pub status: Option<String>,
    /// Filter by priority: low, medium, high (optional).
    pub priority: Option<String>,
    /// Filter by category name or ID (optional).
    pub category: Option<String>,
    /// Only tasks carrying all of these tags (optional).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only tasks past their due date and not completed.
    #[serde(default)]
    pub overdue: bool,
    /// Sort by: created (default), updated, due, priority, title.
    pub sort_by: Option<String>,
    /// Reverse the sort order.
    #[serde(default)]
    pub reverse: bool,
    /// Maximum number of tasks to return (optional, default 50).
    pub limit: Option<usize>,
    /// Number of tasks to skip before returning results (optional).
    pub offset: Option<usize>,
}

/// Input for searching tasks with any combination of criteria.
///
/// All criteria are combined with AND. Date bounds are inclusive; a bare
/// date used as an upper bound covers the whole day.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SearchTasksInput {
    /// Case-insensitive text to find in title or description (optional).
    pub keyword: Option<String>,
    /// Filter by status: pending, in_progress, completed (optional).
    pub status: Option<String>,
    /// Filter by priority: low, medium, high (optional).
    pub priority: Option<String>,
    /// Filter by category name or ID (optional).
    pub category: Option<String>,
    /// Only tasks without a category.
    #[serde(default)]
    pub no_category: bool,
    /// Only tasks carrying all of these tags (optional).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only tasks without tags.
    #[serde(default)]
    pub no_tags: bool,
    /// Created on or after this date (optional).
    pub created_after: Option<String>,
    /// Created on or before this date (optional).
    pub created_before: Option<String>,
    /// Due on or after this date (optional).
    pub due_after: Option<String>,
    /// Due on or before this date (optional).
    pub due_before: Option<String>,
    /// Completed on or after this date (optional).
    pub completed_after: Option<String>,
    /// Completed on or before this date (optional).
    pub completed_before: Option<String>,
    /// Only tasks past their due date and not completed.
    #[serde(default)]
    pub overdue: bool,
    /// Sort by: created (default), updated, due, priority, title.
    pub sort_by: Option<String>,
    /// Reverse the sort order.
    #[serde(default)]
    pub reverse: bool,
    /// Maximum number of tasks to return (optional, default 50).
    pub limit: Option<usize>,
    /// Number of tasks to skip before returning results (optional).
    pub offset: Option<usize>,
}

impl From<ListTasksInput> for SearchTasksInput {
    fn from(input: ListTasksInput) -> Self {
        Self {
            status: input.status,
            priority: input.priority,
            category: input.category,
            tags: input.tags,
            overdue: input.overdue,
            sort_by: input.sort_by,
            reverse: input.reverse,
            limit: input.limit,
            offset: input.offset,
            ..Self::default()
        }
    }
}

/// Input for updating a task.
///
/// For description, category and due date, an empty string clears the value.
/// Status and the derived timestamps are accepted only to be rejected with an
/// explanation: use `start_task` and `complete_task` instead.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateTaskInput {
    /// Task ID.
    pub task_id: i64,
    /// New title (optional).
    pub title: Option<String>,
    /// New description; empty clears (optional).
    pub description: Option<String>,
    /// New priority: low, medium, high (optional).
    pub priority: Option<String>,
    /// New category name or ID; empty clears (optional).
    pub category: Option<String>,
    /// New due date; empty clears (optional).
    pub due_date: Option<String>,
    /// Replace all tags with these (optional).
    pub tags: Option<Vec<String>>,
    /// Not settable; use `start_task` or `complete_task`.
    pub status: Option<String>,
    /// Not settable.
    pub started_at: Option<String>,
    /// Not settable.
    pub completed_at: Option<String>,
    /// Not settable.
    pub created_at: Option<String>,
}

/// Input for creating a category.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddCategoryInput {
    /// Category name (required, unique).
    pub name: String,
    /// Description (optional).
    pub description: Option<String>,
    /// Display color as #RRGGBB (optional).
    pub color: Option<String>,
}

/// Input for updating a category.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateCategoryInput {
    /// Category name or ID.
    pub category: String,
    /// New name (optional).
    pub name: Option<String>,
    /// New description; empty clears (optional).
    pub description: Option<String>,
    /// New color as #RRGGBB; empty clears (optional).
    pub color: Option<String>,
}

/// Input for deleting a category.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CategoryInput {
    /// Category name or ID.
    pub category: String,
}

/// Input for creating a tag.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddTagInput {
    /// Tag name (required, unique).
    pub name: String,
    /// Display color as #RRGGBB (optional).
    pub color: Option<String>,
}

/// Input for updating a tag.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateTagInput {
    /// Current tag name.
    pub tag: String,
    /// New name (optional).
    pub name: Option<String>,
    /// New color as #RRGGBB; empty clears (optional).
    pub color: Option<String>,
}

/// Input for deleting a tag.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TagInput {
    /// Tag name.
    pub tag: String,
}

/// Input for attaching or detaching a tag.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TaskTagInput {
    /// Task ID.
    pub task_id: i64,
    /// Tag name.
    pub tag: String,
}
