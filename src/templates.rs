//! Template loading and rendering using Tera.
//!
//! Human-readable CLI output is rendered from templates compiled into the
//! binary. A directory of `.tera` files can be supplied to override them.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tera::{Context, Tera};

/// Single task view.
pub const TASK_DETAIL: &str = "cli/task_detail.tera";

/// Task listing.
pub const TASK_LIST: &str = "cli/task_list.tera";

/// Statistics summary.
pub const STATS: &str = "cli/stats.tera";

/// Import outcome.
pub const IMPORT_REPORT: &str = "cli/import_report.tera";

/// Embedded templates, used unless overridden.
static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(TASK_DETAIL, include_str!("../templates/cli/task_detail.tera"));
    m.insert(TASK_LIST, include_str!("../templates/cli/task_list.tera"));
    m.insert(STATS, include_str!("../templates/cli/stats.tera"));
    m.insert(IMPORT_REPORT, include_str!("../templates/cli/import_report.tera"));
    m
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the template engine, loading overrides from `templates_dir` when
/// it exists and filling in the rest from the embedded templates.
///
/// # Errors
///
/// Returns an error if the directory contains invalid templates.
pub fn init_templates(templates_dir: Option<&Path>) -> Result<()> {
    let mut tera = match templates_dir.filter(|dir| dir.exists()) {
        Some(dir) => {
            let glob_pattern = format!("{}/**/*.tera", dir.display());
            Tera::new(&glob_pattern).map_err(|e| {
                Error::Template(format!("Failed to load templates from {}: {e}", dir.display()))
            })?
        }
        None => Tera::default(),
    };

    for (name, content) in EMBEDDED_TEMPLATES.iter() {
        if tera.get_template(name).is_err() {
            tera.add_raw_template(name, content)
                .map_err(|e| Error::Template(format!("Invalid embedded template {name}: {e}")))?;
        }
    }

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);
    Ok(())
}

/// Render a template with the given context, initializing on first use.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();
    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    let rendered = tera
        .render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))?;
    drop(guard);

    Ok(rendered)
}

/// Render a template whose context is a single serializable value.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render_value<T: Serialize + ?Sized>(name: &str, key: &str, value: &T) -> Result<String> {
    let mut context = Context::new();
    context.insert(key, value);
    render(name, &context)
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Names of all embedded templates.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{NewTask, Priority, TaskQuery, TaskService};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample_service() -> (TempDir, TaskService) {
        let dir = TempDir::new().unwrap();
        let service = TaskService::open(&dir.path().join("todo.db")).unwrap();
        service.add_category("Work", None, None).unwrap();
        service.add_tag("urgent", None).unwrap();
        let mut new = NewTask::titled("Write report");
        new.priority = Some(Priority::High);
        new.category = Some(crate::tasks::CategoryRef::parse("Work"));
        new.tags = vec!["urgent".into()];
        new.description = Some("Quarterly numbers".into());
        service.add_task(&new).unwrap();
        (dir, service)
    }

    #[test]
    #[serial_test::serial]
    fn test_task_detail_renders_fields() {
        reset_cache().unwrap();
        let (_dir, service) = sample_service();
        let task = service.get_task(1).unwrap();
        let text = render_value(TASK_DETAIL, "task", &task).unwrap();
        assert!(text.contains("Task #1: Write report"));
        assert!(text.contains("high"));
        assert!(text.contains("Work"));
        assert!(text.contains("urgent"));
        assert!(text.contains("Quarterly numbers"));
        assert!(!text.contains("Completed:"));
    }

    #[test]
    #[serial_test::serial]
    fn test_all_embedded_templates_render() {
        reset_cache().unwrap();
        let (_dir, service) = sample_service();
        let tasks = service.search(&TaskQuery::default()).unwrap();
        let stats = service.stats(&TaskQuery::default()).unwrap();

        let mut ctx = Context::new();
        ctx.insert("task", &tasks[0]);
        ctx.insert("tasks", &tasks);
        ctx.insert("total", &(tasks.len() + 1));
        ctx.insert("truncated", &true);
        ctx.insert("next_offset", &tasks.len());
        ctx.insert("stats", &stats);
        ctx.insert(
            "report",
            &json!({"imported": 2, "skipped": 1, "categories_created": 1, "tags_created": 0, "dry_run": true}),
        );

        for name in embedded_template_names() {
            render(name, &ctx).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_empty_task_list() {
        reset_cache().unwrap();
        let mut ctx = Context::new();
        ctx.insert("tasks", &Vec::<serde_json::Value>::new());
        ctx.insert("total", &0);
        assert_eq!(render(TASK_LIST, &ctx).unwrap().trim(), "No tasks found.");
    }

    #[test]
    #[serial_test::serial]
    fn test_filesystem_templates_override_embedded() {
        reset_cache().unwrap();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("cli")).unwrap();
        fs::write(dir.path().join("cli/import_report.tera"), "CUSTOM {{ report.imported }}").unwrap();

        init_templates(Some(dir.path())).unwrap();
        let text = render_value(IMPORT_REPORT, "report", &json!({"imported": 3})).unwrap();
        assert_eq!(text, "CUSTOM 3");
        reset_cache().unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_override_fails() {
        reset_cache().unwrap();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.tera"), "{% if foo %}unclosed").unwrap();

        let err = init_templates(Some(dir.path())).unwrap_err().to_string();
        assert!(err.contains("Failed to load templates"), "Error was: {err}");
        reset_cache().unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_template_fails() {
        reset_cache().unwrap();
        assert!(render("nonexistent.tera", &Context::new()).is_err());
    }
}
