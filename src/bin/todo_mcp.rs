//! MCP server binary for the task tools.
//!
//! Serves the tool surface over stdio. The database comes from
//! `TODO_ASSISTANT_DB`, then the config file, then the platform data directory.

use rmcp::ServiceExt;
use todo_assistant::config::AppConfig;
use todo_assistant::mcp::{self, TodoServer};
use todo_assistant::{logging, paths};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs go to a file
    match paths::log_path() {
        Some(log_path) => {
            if let Err(e) = logging::init_file(&log_path, "info") {
                eprintln!("Warning: MCP logging init failed: {e}");
            }
        }
        None => eprintln!("Warning: no data directory, MCP logging disabled"),
    }

    let config = match paths::config_path() {
        Some(path) => AppConfig::load_or_default(&path).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config file");
            AppConfig::default()
        }),
        None => AppConfig::default(),
    };

    let db_path = paths::db_path(None, config.database.as_deref())
        .ok_or("cannot determine database location; set TODO_ASSISTANT_DB")?;
    let domains = mcp::domains_from_env()?;

    let server = TodoServer::open(&db_path, &domains)?;
    info!(db = %db_path.display(), tools = server.registry().names().len(), "MCP server created, starting stdio transport");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    info!("MCP server stopped");

    Ok(())
}
