//! Tool adapter layer.
//!
//! Every service and query operation is exposed as a named tool with a JSON
//! input schema and a uniform result envelope, for an external agent to call.
//! Tools are grouped by [`ToolDomain`]; a [`ToolRegistry`] binds all of them or
//! a subset of domains.
//!
//! # Example
//!
//! ```no_run
//! use todo_assistant::tasks::TaskService;
//! use todo_assistant::tools::{ToolDomain, ToolRegistry};
//!
//! let service = TaskService::open("/tmp/todo.db").unwrap();
//! let registry = ToolRegistry::for_domains(service, &[ToolDomain::Task]);
//! let result = registry.call("add_task", serde_json::json!({"title": "Write report"}));
//! assert!(result.success);
//! ```

pub mod handlers;
pub mod inputs;

use crate::error::{Error, ErrorKind, Result};
use crate::tasks::TaskService;
use inputs::{
    AddCategoryInput, AddTagInput, AddTaskInput, CategoryInput, ListTasksInput, NoInput,
    SearchTasksInput, TagInput, TaskIdInput, TaskTagInput, UpdateCategoryInput, UpdateTagInput,
    UpdateTaskInput,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

pub use handlers::build_query;

/// Group a tool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolDomain {
    /// Task lifecycle and queries.
    Task,
    /// Category management.
    Category,
    /// Tag management.
    Tag,
}

impl ToolDomain {
    /// All domains, in catalog order.
    pub const ALL: [Self; 3] = [Self::Task, Self::Category, Self::Tag];

    /// Parse a domain name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "task" | "tasks" => Ok(Self::Task),
            "category" | "categories" => Ok(Self::Category),
            "tag" | "tags" => Ok(Self::Tag),
            other => Err(Error::validation(format!(
                "invalid tool domain '{other}' (must be one of: task, category, tag)"
            ))),
        }
    }

    /// Parse a comma-separated list of domain names. Blank input means all.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        let mut domains = Vec::new();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let domain = Self::from_str(name)?;
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        Ok(if domains.is_empty() { Self::ALL.to_vec() } else { domains })
    }

    /// The domain name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ToolDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniform result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error category on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None, error_kind: None }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    /// Serialize as pretty JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(r#"{{"success": false, "error": "failed to encode result: {e}"}}"#)
        })
    }
}

impl From<Result<Value>> for ToolResult {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

/// Public description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: &'static str,
    /// Domain group.
    pub domain: ToolDomain,
    /// What the tool does, including side effects.
    pub description: &'static str,
    /// Whether the tool only reads.
    pub read_only: bool,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

type Handler = fn(&TaskService, Value) -> Result<Value>;

struct Tool {
    name: &'static str,
    domain: ToolDomain,
    description: &'static str,
    read_only: bool,
    schema: fn() -> Value,
    handler: Handler,
}

fn schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Decode tool arguments; `null` counts as no arguments.
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { Value::Object(serde_json::Map::new()) } else { args };
    serde_json::from_value(args).map_err(|e| Error::validation(format!("invalid arguments: {e}")))
}

macro_rules! tool {
    ($name:ident, $domain:ident, $input:ty, read_only: $read_only:expr, $description:expr) => {
        Tool {
            name: stringify!($name),
            domain: ToolDomain::$domain,
            description: $description,
            read_only: $read_only,
            schema: schema::<$input>,
            handler: |service, args| handlers::$name(service, parse_args::<$input>(args)?),
        }
    };
}

static CATALOG: &[Tool] = &[
    tool!(current_datetime, Task, NoInput, read_only: true,
        "Get the current date, time and weekday (UTC). Use it to resolve relative dates."),
    tool!(add_task, Task, AddTaskInput, read_only: false,
        "Create a task. Status starts as pending. Category and tags must already exist."),
    tool!(list_tasks, Task, ListTasksInput, read_only: true,
        "List tasks filtered by status, priority, category, tags or overdue, oldest first."),
    tool!(search_tasks, Task, SearchTasksInput, read_only: true,
        "Search tasks by keyword and any combination of filters and inclusive date ranges."),
    tool!(show_task, Task, TaskIdInput, read_only: true,
        "Show one task with its category and tags."),
    tool!(update_task, Task, UpdateTaskInput, read_only: false,
        "Change a task's title, description, priority, category, due date or tags. Status cannot be set here."),
    tool!(start_task, Task, TaskIdInput, read_only: false,
        "Move a pending task to in progress and record the start time."),
    tool!(complete_task, Task, TaskIdInput, read_only: false,
        "Mark a pending or in-progress task completed and record the completion time."),
    tool!(delete_task, Task, TaskIdInput, read_only: false,
        "Permanently delete a task and its tag links. Tags themselves are kept."),
    tool!(task_stats, Task, SearchTasksInput, read_only: true,
        "Statistics over tasks (all, or those matching the filters): counts by status, priority and category, overdue, completion rate."),
    tool!(add_category, Category, AddCategoryInput, read_only: false,
        "Create a category with a unique name."),
    tool!(list_categories, Category, NoInput, read_only: true,
        "List categories with the number of tasks in each."),
    tool!(update_category, Category, UpdateCategoryInput, read_only: false,
        "Rename a category or change its description or color."),
    tool!(delete_category, Category, CategoryInput, read_only: false,
        "Delete a category. Its tasks are kept and become uncategorized."),
    tool!(add_tag, Tag, AddTagInput, read_only: false,
        "Create a tag with a unique name."),
    tool!(list_tags, Tag, NoInput, read_only: true,
        "List tags with the number of tasks carrying each."),
    tool!(update_tag, Tag, UpdateTagInput, read_only: false,
        "Rename a tag or change its color."),
    tool!(delete_tag, Tag, TagInput, read_only: false,
        "Delete a tag and remove it from all tasks. The tasks are kept."),
    tool!(tag_task, Tag, TaskTagInput, read_only: false,
        "Attach an existing tag to a task."),
    tool!(untag_task, Tag, TaskTagInput, read_only: false,
        "Remove a tag from a task."),
];

/// Log scope of one tool call.
///
/// Logs entry on creation and the outcome on drop, so every exit path is
/// recorded, including unwinding.
#[derive(Debug)]
pub struct CallScope {
    tool: String,
    started: Instant,
    outcome: Option<bool>,
}

impl CallScope {
    /// Enter a call of `tool`.
    #[must_use]
    pub fn enter(tool: &str) -> Self {
        debug!(tool, "tool call started");
        Self { tool: tool.to_string(), started: Instant::now(), outcome: None }
    }

    /// Record the result before the scope closes.
    pub fn finish(&mut self, result: &ToolResult) {
        self.outcome = Some(result.success);
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match self.outcome {
            Some(true) => info!(tool = %self.tool, elapsed_ms, "tool call succeeded"),
            Some(false) => warn!(tool = %self.tool, elapsed_ms, "tool call failed"),
            None => warn!(tool = %self.tool, elapsed_ms, "tool call aborted"),
        }
    }
}

/// Definitions of the tools in `domains`, in catalog order.
#[must_use]
pub fn definitions(domains: &[ToolDomain]) -> Vec<ToolDefinition> {
    CATALOG
        .iter()
        .filter(|tool| domains.contains(&tool.domain))
        .map(|tool| ToolDefinition {
            name: tool.name,
            domain: tool.domain,
            description: tool.description,
            read_only: tool.read_only,
            input_schema: (tool.schema)(),
        })
        .collect()
}

/// A bound set of tools over one service.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    service: TaskService,
    domains: Vec<ToolDomain>,
}

impl ToolRegistry {
    /// Bind every tool.
    #[must_use]
    pub fn all(service: TaskService) -> Self {
        Self::for_domains(service, &ToolDomain::ALL)
    }

    /// Bind only the tools of `domains`.
    #[must_use]
    pub fn for_domains(service: TaskService, domains: &[ToolDomain]) -> Self {
        Self { service, domains: domains.to_vec() }
    }

    /// The service the tools call into.
    #[must_use]
    pub const fn service(&self) -> &TaskService {
        &self.service
    }

    fn bound(&self) -> impl Iterator<Item = &'static Tool> + '_ {
        CATALOG.iter().filter(|tool| self.domains.contains(&tool.domain))
    }

    /// Names of the bound tools, in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.bound().map(|tool| tool.name).collect()
    }

    /// Definitions of the bound tools, in catalog order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        definitions(&self.domains)
    }

    /// Call a bound tool by name with JSON arguments.
    ///
    /// Never fails: unknown tools, bad arguments and service errors all come
    /// back as a failed envelope.
    pub fn call(&self, name: &str, args: Value) -> ToolResult {
        match self.bound().find(|tool| tool.name == name) {
            Some(tool) => self.invoke(tool.name, |service| (tool.handler)(service, args)),
            None => ToolResult::failure(&Error::not_found("tool", name)),
        }
    }

    /// Run `f` as the bound tool `name`. Unbound names fail like unknown ones.
    pub fn dispatch(&self, name: &str, f: impl FnOnce(&TaskService) -> Result<Value>) -> ToolResult {
        if self.bound().any(|tool| tool.name == name) {
            self.invoke(name, f)
        } else {
            ToolResult::failure(&Error::not_found("tool", name))
        }
    }

    /// Run `f` against the service inside a call scope, producing an envelope.
    ///
    /// Panics inside `f` are caught and reported as a failed envelope.
    pub fn invoke(&self, name: &str, f: impl FnOnce(&TaskService) -> Result<Value>) -> ToolResult {
        let mut scope = CallScope::enter(name);
        let result = catch_unwind(AssertUnwindSafe(|| f(&self.service))).map_or_else(
            |panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ToolResult::failure(&Error::Internal(format!("{name}: {message}")))
            },
            ToolResult::from,
        );
        scope.finish(&result);
        result
    }
}
