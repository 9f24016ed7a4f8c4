//! MCP server exposing the tool catalog.
//!
//! Each MCP tool forwards to the same handler as [`ToolRegistry::call`], so the
//! result text is always the `{success, data, error}` envelope. Tool listings
//! only show the bound domains and take their descriptions from the catalog.

// The rmcp `#[tool(aggr)]` macro requires ownership of input structs,
// making pass-by-value necessary for all tool handler functions.
#![allow(clippy::needless_pass_by_value)]

use crate::error::Result;
use crate::tasks::TaskService;
use crate::tools::handlers;
use crate::tools::inputs::{
    AddCategoryInput, AddTagInput, AddTaskInput, CategoryInput, ListTasksInput, NoInput,
    SearchTasksInput, TagInput, TaskIdInput, TaskTagInput, UpdateCategoryInput, UpdateTagInput,
    UpdateTaskInput,
};
use crate::tools::{ToolDomain, ToolRegistry};
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::tool;
use rmcp::Error as McpError;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Instructions for the MCP server, shown to agents using this server.
const INSTRUCTIONS: &str = r"Personal task tracker. Use these tools to manage the user's tasks, categories and tags.

## Conventions

- Call `current_datetime` before interpreting relative dates such as 'next Friday'.
- Dates accept YYYY-MM-DD, YYYY-MM-DD HH:MM, RFC 3339, or today/tomorrow/yesterday/next week/next month. Times are UTC.
- Priorities are low, medium (default) and high. Statuses are pending, in_progress and completed.
- Categories and tags must exist before a task can use them: create them with `add_category` / `add_tag` first.

## Lifecycle

A task moves pending -> in_progress -> completed. Use `start_task` and `complete_task`; `update_task` cannot change status.
A pending task may be completed directly. Completed tasks cannot be reopened.

## Results

Every tool returns JSON `{success, data}` or `{success: false, error, error_kind}`.
List and search results carry `showing`, `offset`, `total` and `truncated`. `total` counts every match; page with `limit` and `offset`.
";

type ToolResponse = std::result::Result<CallToolResult, McpError>;

/// MCP server for the task tools.
#[derive(Clone)]
pub struct TodoServer {
    registry: Arc<ToolRegistry>,
}

impl TodoServer {
    /// Create a server over a bound registry.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    /// Open the database at `db_path` and bind the tools of `domains`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn open(db_path: &Path, domains: &[ToolDomain]) -> Result<Self> {
        let service = TaskService::open(db_path)?;
        Ok(Self::new(ToolRegistry::for_domains(service, domains)))
    }

    /// The registry behind this server.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The MCP tools of the bound domains, in catalog order.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        let mut schemas = Self::tool_box().list();
        self.registry
            .definitions()
            .into_iter()
            .filter_map(|definition| {
                let index = schemas.iter().position(|tool| tool.name == definition.name)?;
                let mut tool = schemas.swap_remove(index);
                tool.description = definition.description.into();
                Some(tool)
            })
            .collect()
    }

    /// Run a tool and wrap its envelope as an MCP result.
    fn respond(
        &self,
        name: &str,
        f: impl FnOnce(&TaskService) -> Result<Value>,
    ) -> ToolResponse {
        let result = self.registry.dispatch(name, f);
        let content = vec![Content::text(result.to_json())];
        Ok(if result.success {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        })
    }
}

#[tool(tool_box)]
impl TodoServer {
    #[tool]
    fn current_datetime(&self) -> ToolResponse {
        self.respond("current_datetime", |s| handlers::current_datetime(s, NoInput {}))
    }

    #[tool]
    fn add_task(&self, #[tool(aggr)] input: AddTaskInput) -> ToolResponse {
        self.respond("add_task", |s| handlers::add_task(s, input))
    }

    #[tool]
    fn list_tasks(&self, #[tool(aggr)] input: ListTasksInput) -> ToolResponse {
        self.respond("list_tasks", |s| handlers::list_tasks(s, input))
    }

    #[tool]
    fn search_tasks(&self, #[tool(aggr)] input: SearchTasksInput) -> ToolResponse {
        self.respond("search_tasks", |s| handlers::search_tasks(s, input))
    }

    #[tool]
    fn show_task(&self, #[tool(aggr)] input: TaskIdInput) -> ToolResponse {
        self.respond("show_task", |s| handlers::show_task(s, input))
    }

    #[tool]
    fn update_task(&self, #[tool(aggr)] input: UpdateTaskInput) -> ToolResponse {
        self.respond("update_task", |s| handlers::update_task(s, input))
    }

    #[tool]
    fn start_task(&self, #[tool(aggr)] input: TaskIdInput) -> ToolResponse {
        self.respond("start_task", |s| handlers::start_task(s, input))
    }

    #[tool]
    fn complete_task(&self, #[tool(aggr)] input: TaskIdInput) -> ToolResponse {
        self.respond("complete_task", |s| handlers::complete_task(s, input))
    }

    #[tool]
    fn delete_task(&self, #[tool(aggr)] input: TaskIdInput) -> ToolResponse {
        self.respond("delete_task", |s| handlers::delete_task(s, input))
    }

    #[tool]
    fn task_stats(&self, #[tool(aggr)] input: SearchTasksInput) -> ToolResponse {
        self.respond("task_stats", |s| handlers::task_stats(s, input))
    }

    #[tool]
    fn add_category(&self, #[tool(aggr)] input: AddCategoryInput) -> ToolResponse {
        self.respond("add_category", |s| handlers::add_category(s, input))
    }

    #[tool]
    fn list_categories(&self) -> ToolResponse {
        self.respond("list_categories", |s| handlers::list_categories(s, NoInput {}))
    }

    #[tool]
    fn update_category(&self, #[tool(aggr)] input: UpdateCategoryInput) -> ToolResponse {
        self.respond("update_category", |s| handlers::update_category(s, input))
    }

    #[tool]
    fn delete_category(&self, #[tool(aggr)] input: CategoryInput) -> ToolResponse {
        self.respond("delete_category", |s| handlers::delete_category(s, input))
    }

    #[tool]
    fn add_tag(&self, #[tool(aggr)] input: AddTagInput) -> ToolResponse {
        self.respond("add_tag", |s| handlers::add_tag(s, input))
    }

    #[tool]
    fn list_tags(&self) -> ToolResponse {
        self.respond("list_tags", |s| handlers::list_tags(s, NoInput {}))
    }

    #[tool]
    fn update_tag(&self, #[tool(aggr)] input: UpdateTagInput) -> ToolResponse {
        self.respond("update_tag", |s| handlers::update_tag(s, input))
    }

    #[tool]
    fn delete_tag(&self, #[tool(aggr)] input: TagInput) -> ToolResponse {
        self.respond("delete_tag", |s| handlers::delete_tag(s, input))
    }

    #[tool]
    fn tag_task(&self, #[tool(aggr)] input: TaskTagInput) -> ToolResponse {
        self.respond("tag_task", |s| handlers::tag_task(s, input))
    }

    #[tool]
    fn untag_task(&self, #[tool(aggr)] input: TaskTagInput) -> ToolResponse {
        self.respond("untag_task", |s| handlers::untag_task(s, input))
    }
}

impl rmcp::ServerHandler for TodoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "todo-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult { next_cursor: None, tools: self.tools() })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> ToolResponse {
        let context = ToolCallContext::new(self, request, context);
        Self::tool_box().call(context).await
    }
}
