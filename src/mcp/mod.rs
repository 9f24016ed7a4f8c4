//! MCP (Model Context Protocol) server for the tool surface.
//!
//! The server binds the tool domains named in [`TOOLS_ENV`], or all of them.

#[cfg(feature = "mcp")]
pub mod server;

#[cfg(feature = "mcp")]
pub use server::TodoServer;

use crate::error::Result;
use crate::tools::ToolDomain;

/// Environment variable listing the tool domains to expose, comma separated.
pub const TOOLS_ENV: &str = "TODO_ASSISTANT_TOOLS";

/// Domains to bind, read from [`TOOLS_ENV`]. Unset or blank binds every domain.
///
/// # Errors
///
/// Returns a validation error if the variable names an unknown domain.
pub fn domains_from_env() -> Result<Vec<ToolDomain>> {
    std::env::var(TOOLS_ENV).map_or_else(|_| Ok(ToolDomain::ALL.to_vec()), |v| ToolDomain::parse_list(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_domains_from_env() {
        std::env::remove_var(TOOLS_ENV);
        assert_eq!(domains_from_env().unwrap(), ToolDomain::ALL.to_vec());

        std::env::set_var(TOOLS_ENV, "tag, task");
        assert_eq!(domains_from_env().unwrap(), vec![ToolDomain::Tag, ToolDomain::Task]);

        std::env::set_var(TOOLS_ENV, "tasks,bogus");
        assert!(domains_from_env().is_err());

        std::env::remove_var(TOOLS_ENV);
    }
}
