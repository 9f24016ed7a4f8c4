//! Tests for the CLI module.

use super::*;
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use tempfile::TempDir;

/// A scratch database and config file.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn run(&self, args: &[&str]) -> CliOutput {
        let (db, config) = (self.path("todo.db"), self.path("config.yaml"));
        let mut argv = vec!["todo", "--db", db.as_str(), "--config", config.as_str()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv).unwrap())
    }

    fn ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert_eq!(output.exit_code, ExitCode::SUCCESS, "{args:?} failed: {:?}", output.stderr);
        output.stdout.join("\n")
    }

    fn json(&self, args: &[&str]) -> Value {
        let mut argv = vec!["--json"];
        argv.extend_from_slice(args);
        serde_json::from_str(&self.ok(&argv)).unwrap()
    }

    fn exit_code(&self, args: &[&str]) -> ExitCode {
        self.run(args).exit_code
    }
}

#[test]
fn test_run_version() {
    let sandbox = Sandbox::new();
    assert!(sandbox.ok(&["version"]).contains("todo-assistant"));
}

#[test]
fn test_parse_aliases() {
    assert!(matches!(Cli::try_parse_from(["todo", "ls"]).unwrap().command, Command::List(_)));
    assert!(matches!(
        Cli::try_parse_from(["todo", "done", "3"]).unwrap().command,
        Command::Complete { id: 3 }
    ));
    assert!(matches!(
        Cli::try_parse_from(["todo", "rm", "3"]).unwrap().command,
        Command::Delete { id: 3 }
    ));
    assert!(Cli::try_parse_from(["todo", "update", "1", "--tags", "a", "--clear-tags"]).is_err());
    assert!(Cli::try_parse_from(["todo", "show", "abc"]).is_err());
}

#[test]
fn test_add_and_show() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["category", "add", "Work"]);
    sandbox.ok(&["tag", "add", "urgent"]);

    let added = sandbox.ok(&[
        "add", "Write report", "-p", "high", "-c", "Work", "-t", "urgent", "--due", "2030-01-15",
    ]);
    assert_eq!(added, "Added task #1: Write report");

    let shown = sandbox.ok(&["show", "1"]);
    assert!(shown.contains("Task #1: Write report"));
    assert!(shown.contains("Work"));
    assert!(shown.contains("urgent"));
    assert!(shown.contains("2030-01-15"));

    let task = sandbox.json(&["show", "1"]);
    assert_eq!(task["priority"], "high");
    assert_eq!(task["status"], "pending");
}

#[test]
fn test_list_and_search() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.ok(&["list"]).trim(), "No tasks found.");

    sandbox.ok(&["add", "Buy milk"]);
    sandbox.ok(&["add", "Write report", "-d", "quarterly numbers"]);

    let listing = sandbox.ok(&["ls"]);
    assert!(listing.contains("#1 Buy milk"));
    assert!(listing.contains("Showing 2 of 2"));

    let found = sandbox.json(&["search", "QUARTERLY"]);
    assert_eq!(found["total"], 1);
    assert_eq!(found["tasks"][0]["title"], "Write report");

    let limited = sandbox.json(&["list", "--limit", "1", "--sort", "title", "--reverse"]);
    assert_eq!(limited["showing"], 1);
    assert_eq!(limited["truncated"], true);
    assert_eq!(limited["tasks"][0]["title"], "Write report");

    let page = sandbox.ok(&["list", "--limit", "1"]);
    assert!(page.contains("Showing 1 of 2 task(s). More remain: use --offset 1"));
}

#[test]
fn test_list_shows_every_task_without_limit() {
    let sandbox = Sandbox::new();
    for n in 0..55 {
        sandbox.ok(&["add", &format!("Task {n}")]);
    }

    let listing = sandbox.json(&["list"]);
    assert_eq!(listing["showing"], 55);
    assert_eq!(listing["truncated"], false);

    let text = sandbox.ok(&["search", "Task"]);
    assert!(text.contains("Showing 55 of 55"));
    assert!(!text.contains("More remain"));
}

#[test]
fn test_lifecycle_exit_codes() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["add", "Task"]);

    assert_eq!(sandbox.ok(&["start", "1"]), "Started task #1: Task");
    assert_eq!(sandbox.exit_code(&["start", "1"]), ExitCode::from(4));
    assert_eq!(sandbox.ok(&["done", "1"]), "Completed task #1: Task");
    assert_eq!(sandbox.exit_code(&["complete", "1"]), ExitCode::from(4));

    let task = sandbox.json(&["show", "1"]);
    assert_eq!(task["status"], "completed");
    assert!(task["started_at"].is_string());

    assert_eq!(sandbox.exit_code(&["show", "99"]), ExitCode::from(3));
    let output = sandbox.run(&["start", "99"]);
    assert!(output.stderr[0].starts_with("Error: task not found"));
}

#[test]
fn test_update_and_validation() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["tag", "add", "a"]);
    sandbox.ok(&["tag", "add", "b"]);
    sandbox.ok(&["add", "Task", "-d", "notes", "-t", "a"]);

    let task = sandbox.json(&["update", "1", "--title", "Renamed", "-d", "", "--tags", "a,b"]);
    assert_eq!(task["title"], "Renamed");
    assert!(task["description"].is_null());
    assert_eq!(task["tags"].as_array().unwrap().len(), 2);

    let cleared = sandbox.json(&["update", "1", "--clear-tags"]);
    assert!(cleared["tags"].as_array().unwrap().is_empty());

    assert_eq!(sandbox.exit_code(&["update", "1"]), ExitCode::from(2));
    assert_eq!(sandbox.exit_code(&["update", "1", "-p", "urgent"]), ExitCode::from(2));
    assert_eq!(sandbox.exit_code(&["add", "   "]), ExitCode::from(2));
    assert_eq!(sandbox.exit_code(&["add", "x", "--due", "someday"]), ExitCode::from(2));
}

#[test]
fn test_delete_task() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["add", "Gone soon"]);
    assert_eq!(sandbox.ok(&["rm", "1"]), "Deleted task #1: Gone soon");
    assert_eq!(sandbox.exit_code(&["show", "1"]), ExitCode::from(3));
}

#[test]
fn test_category_commands() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.ok(&["category", "list"]), "No categories.");
    assert_eq!(sandbox.ok(&["category", "add", "Home", "--color", "#00FF00"]), "Added category #1: Home");
    assert_eq!(sandbox.exit_code(&["category", "add", "Home"]), ExitCode::from(5));
    assert_eq!(sandbox.exit_code(&["category", "add", "Bad", "--color", "green"]), ExitCode::from(2));

    sandbox.ok(&["add", "Dishes", "-c", "Home"]);
    assert!(sandbox.ok(&["category", "ls"]).contains("#1 Home (1 task(s))"));

    sandbox.ok(&["category", "update", "Home", "--name", "House"]);
    let deleted = sandbox.ok(&["category", "delete", "1"]);
    assert!(deleted.contains("House"));
    assert!(deleted.contains("1 task(s) now uncategorized"));

    let task = sandbox.json(&["show", "1"]);
    assert!(task["category"].is_null());
}

#[test]
fn test_tag_commands() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["tag", "add", "errand"]);
    sandbox.ok(&["add", "Post office"]);

    assert_eq!(sandbox.ok(&["tag", "attach", "1", "errand"]), "Tagged task #1: Post office");
    assert_eq!(sandbox.exit_code(&["tag", "attach", "1", "errand"]), ExitCode::from(5));
    assert_eq!(sandbox.exit_code(&["tag", "attach", "1", "missing"]), ExitCode::from(3));

    let filtered = sandbox.json(&["list", "-t", "errand"]);
    assert_eq!(filtered["total"], 1);

    sandbox.ok(&["tag", "detach", "1", "errand"]);
    let untagged = sandbox.json(&["list", "--no-tags"]);
    assert_eq!(untagged["total"], 1);

    sandbox.ok(&["tag", "update", "errand", "--name", "chore"]);
    assert!(sandbox.ok(&["tag", "list"]).contains("chore"));
    assert!(sandbox.ok(&["tag", "rm", "chore"]).contains("removed from 0 task(s)"));
}

#[test]
fn test_stats() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["add", "One", "-p", "high"]);
    sandbox.ok(&["add", "Two"]);
    sandbox.ok(&["done", "2"]);

    let text = sandbox.ok(&["stats"]);
    assert!(text.contains("Tasks: 2"));
    assert!(text.contains("Completion rate: 50"));

    let stats = sandbox.json(&["stats", "-s", "pending"]);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["high_priority_open"], 1);
}

#[test]
fn test_export_import_round_trip() {
    let source = Sandbox::new();
    source.ok(&["category", "add", "Work"]);
    source.ok(&["tag", "add", "q3"]);
    source.ok(&["add", "Report, final", "-c", "Work", "-t", "q3", "-d", "line one\nline two"]);
    source.ok(&["add", "Done thing"]);
    source.ok(&["done", "2"]);

    let file = source.path("tasks.csv");
    assert!(source.ok(&["export", "-o", &file]).contains("Exported"));

    let target = Sandbox::new();
    let dry = target.json(&["import", &file, "--dry-run"]);
    assert_eq!(dry["imported"], 2);
    assert_eq!(dry["categories_created"], 1);
    assert_eq!(dry["dry_run"], true);
    assert_eq!(target.json(&["list"])["total"], 0);

    let text = target.ok(&["import", &file]);
    assert!(text.contains("Imported 2 task(s)"));
    let listing = target.json(&["list", "--sort", "title"]);
    assert_eq!(listing["tasks"][1]["title"], "Report, final");
    assert_eq!(listing["tasks"][1]["category"]["name"], "Work");
    assert_eq!(listing["tasks"][1]["description"], "line one\nline two");
    assert_eq!(listing["tasks"][0]["status"], "completed");

    let again = target.json(&["import", &file, "--skip-existing"]);
    assert_eq!(again["skipped"], 2);

    let open_only = source.ok(&["export", "--format", "json", "--no-completed"]);
    let records: Value = serde_json::from_str(&open_only).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[test]
fn test_import_rejects_bad_input() {
    let sandbox = Sandbox::new();
    let file = sandbox.path("tasks.json");
    std::fs::write(&file, r#"[{"title": "ok"}, {"title": ""}]"#).unwrap();

    let output = sandbox.run(&["import", &file]);
    assert_eq!(output.exit_code, ExitCode::from(2));
    assert!(output.stderr[0].contains("record 2"));
    assert_eq!(sandbox.json(&["list"])["total"], 0);

    let unknown = sandbox.path("tasks.txt");
    std::fs::write(&unknown, "[]").unwrap();
    assert_eq!(sandbox.exit_code(&["import", &unknown]), ExitCode::from(2));
}

#[test]
fn test_config_commands() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.exit_code(&["config", "set"]), ExitCode::from(2));
    assert_eq!(sandbox.exit_code(&["config", "set", "--backend", "skynet"]), ExitCode::from(2));

    sandbox.ok(&["config", "set", "--api-key", "sk-abcdefghijklmnop", "--backend", "qwen"]);
    let shown = sandbox.json(&["config", "show"]);
    assert_eq!(shown["chat"]["api_key"], crate::config::mask_secret("sk-abcdefghijklmnop"));
    assert!(shown["chat"]["api_key"].as_str().unwrap().ends_with("mnop"));
    assert_eq!(shown["chat"]["backend"], "dashscope");
    assert_eq!(shown["chat"]["model"], crate::config::DEFAULT_MODEL);
    assert_eq!(shown["chat"]["model_source"], "default");
    assert!(!sandbox.ok(&["config", "show"]).contains("sk-abcdefghijklmnop"));

    sandbox.ok(&["config", "reset"]);
    let shown = sandbox.json(&["config", "show"]);
    assert!(shown["chat"]["api_key"].is_null());
}

#[test]
#[serial_test::serial]
fn test_assistant_select() {
    for backend in crate::assistant::Backend::PRIORITY {
        std::env::remove_var(backend.env_var());
    }
    let sandbox = Sandbox::new();

    let none = sandbox.json(&["assistant", "select"]);
    assert_eq!(none["backend"], "openai");
    assert_eq!(none["credentials_missing"], true);

    std::env::set_var("GOOGLE_API_KEY", "g-test");
    let gemini = sandbox.json(&["assistant", "select"]);
    assert_eq!(gemini["backend"], "gemini");
    assert_eq!(gemini["model"], "gemini-2.0-flash-exp");

    let backends = sandbox.json(&["assistant", "backends"]);
    assert_eq!(backends[0]["backend"], "dashscope");
    assert_eq!(backends[1]["available"], true);

    assert_eq!(
        sandbox.exit_code(&["assistant", "select", "--backend", "dashscope"]),
        ExitCode::from(2)
    );
    let chosen = sandbox.json(&["assistant", "select", "--backend", "openai", "--api-key", "sk-x", "--model", "m"]);
    assert_eq!(chosen["backend"], "openai");
    assert_eq!(chosen["model"], "m");

    std::env::remove_var("GOOGLE_API_KEY");
}

#[test]
fn test_assistant_tools() {
    let sandbox = Sandbox::new();
    let tools = sandbox.json(&["assistant", "tools", "--domain", "tag"]);
    let names: Vec<&str> = tools.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["add_tag", "list_tags", "update_tag", "delete_tag", "tag_task", "untag_task"]);

    let text = sandbox.ok(&["assistant", "tools"]);
    assert!(text.contains("current_datetime"));
    assert_eq!(sandbox.exit_code(&["assistant", "tools", "-d", "notes"]), ExitCode::from(2));
}
