//! Command execution for the CLI.
//!
//! Task, category and tag commands go through the same handlers as the tool
//! surface, so argument coercion and error kinds match across both.

use crate::assistant::{select_for_chat, Backend, Credentials};
use crate::cli::{
    AssistantCommand, CategoryCommand, Cli, Command, ConfigCommand, RangeArgs, TagCommand,
};
use crate::config::{mask_secret, resolve_chat, AppConfig, ChatConfig, ChatOverrides};
use crate::error::{Error, Result};
use crate::paths;
use crate::tasks::transfer::{self, ExportFormat, ImportOptions};
use crate::tasks::{TaskQuery, TaskService};
use crate::templates;
use crate::tools::handlers;
use crate::tools::inputs::{
    AddCategoryInput, AddTagInput, AddTaskInput, CategoryInput, NoInput, SearchTasksInput,
    TagInput, TaskIdInput, TaskTagInput, UpdateCategoryInput, UpdateTagInput, UpdateTaskInput,
};
use crate::tools::{build_query, definitions, ToolDomain};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Where settings and data live for this invocation.
struct Env {
    json: bool,
    config_flag: Option<PathBuf>,
    db_flag: Option<PathBuf>,
}

impl Env {
    fn config_path(&self) -> Result<PathBuf> {
        self.config_flag.clone().or_else(paths::config_path).ok_or_else(|| {
            Error::validation("cannot determine the config directory; pass --config")
        })
    }

    fn load_config(&self) -> Result<AppConfig> {
        AppConfig::load_or_default(&self.config_path()?)
    }

    fn db_path(&self, config: &AppConfig) -> Result<PathBuf> {
        paths::db_path(self.db_flag.as_deref(), config.database.as_deref())
            .ok_or_else(|| Error::validation("cannot determine the data directory; pass --db"))
    }

    fn open_service(&self) -> Result<TaskService> {
        let config = self.load_config()?;
        let path = self.db_path(&config)?;
        debug!(path = %path.display(), "opening database");
        TaskService::open(path)
    }

    /// Print `data` as JSON, or as the text produced by `text`.
    fn show(&self, data: &Value, text: impl FnOnce(&Value) -> Result<String>) -> Result<CliOutput> {
        if self.json {
            json_output(data)
        } else {
            Ok(success_output(text(data)?))
        }
    }
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> CliOutput {
    let env = Env { json: cli.json, config_flag: cli.config, db_flag: cli.db };
    execute(&env, cli.command).unwrap_or_else(|e| error_output(&e))
}

fn execute(env: &Env, command: Command) -> Result<CliOutput> {
    match command {
        Command::Version => Ok(success_output(format!("todo-assistant v{}", crate::VERSION))),
        Command::Config(cmd) => run_config_cmd(env, cmd),
        Command::Assistant(cmd) => run_assistant_cmd(env, cmd),
        command => {
            let service = env.open_service()?;
            run_task_cmd(env, &service, command)
        }
    }
}

// === Tasks ===

fn run_task_cmd(env: &Env, service: &TaskService, command: Command) -> Result<CliOutput> {
    match command {
        Command::Add { title, description, priority, category, tags, due } => {
            let input = AddTaskInput { title, description, priority, category, tags, due_date: due };
            let task = handlers::add_task(service, input)?;
            env.show(&task, |t| Ok(task_line("Added", t)))
        }
        Command::List(filters) => {
            let input = filters.to_input(None, &RangeArgs::default());
            let listing = handlers::search_tasks(service, unlimited(input))?;
            env.show(&listing, render_listing)
        }
        Command::Search { keyword, filters, ranges } => {
            let input = filters.to_input(keyword, &ranges);
            let listing = handlers::search_tasks(service, unlimited(input))?;
            env.show(&listing, render_listing)
        }
        Command::Show { id } => {
            let task = handlers::show_task(service, TaskIdInput { task_id: id })?;
            env.show(&task, |t| templates::render_value(templates::TASK_DETAIL, "task", t))
        }
        Command::Update { id, title, description, priority, category, due, tags, clear_tags } => {
            let input = UpdateTaskInput {
                task_id: id,
                title,
                description,
                priority,
                category,
                due_date: due,
                tags: if clear_tags { Some(Vec::new()) } else { tags },
                ..UpdateTaskInput::default()
            };
            let task = handlers::update_task(service, input)?;
            env.show(&task, |t| Ok(task_line("Updated", t)))
        }
        Command::Start { id } => {
            let task = handlers::start_task(service, TaskIdInput { task_id: id })?;
            env.show(&task, |t| Ok(task_line("Started", t)))
        }
        Command::Complete { id } => {
            let task = handlers::complete_task(service, TaskIdInput { task_id: id })?;
            env.show(&task, |t| Ok(task_line("Completed", t)))
        }
        Command::Delete { id } => {
            let deleted = handlers::delete_task(service, TaskIdInput { task_id: id })?;
            env.show(&deleted, |d| Ok(task_line("Deleted", &d["deleted"])))
        }
        Command::Stats { filters, ranges } => {
            let stats = handlers::task_stats(service, filters.to_input(None, &ranges))?;
            env.show(&stats, |s| templates::render_value(templates::STATS, "stats", s))
        }
        Command::Category(cmd) => run_category_cmd(env, service, cmd),
        Command::Tag(cmd) => run_tag_cmd(env, service, cmd),
        Command::Export { format, output, no_completed, filters } => {
            let format = match (&format, &output) {
                (Some(name), _) => ExportFormat::from_str(name)?,
                (None, Some(path)) => ExportFormat::from_path(path).unwrap_or_default(),
                (None, None) => ExportFormat::default(),
            };
            let input = filters.to_input(None, &RangeArgs::default());
            let query = TaskQuery { limit: input.limit, ..build_query(&input, service.now())? };
            let text = transfer::export(service, &query, !no_completed, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    Ok(success_output(format!("Exported tasks to {}", path.display())))
                }
                None => Ok(success_output(text.trim_end().to_string())),
            }
        }
        Command::Import { file, format, dry_run, skip_existing } => {
            run_import(env, service, &file, format.as_deref(), ImportOptions { dry_run, skip_existing })
        }
        Command::Version | Command::Config(_) | Command::Assistant(_) => {
            Err(Error::Internal("command does not use the task database".into()))
        }
    }
}

fn run_import(
    env: &Env,
    service: &TaskService,
    file: &Path,
    format: Option<&str>,
    options: ImportOptions,
) -> Result<CliOutput> {
    let format = match format {
        Some(name) => ExportFormat::from_str(name)?,
        None => ExportFormat::from_path(file)?,
    };
    let text = std::fs::read_to_string(file)?;
    let records = transfer::parse(&text, format, service.now())?;
    let report = transfer::import(service, &records, options)?;
    let data = serde_json::to_value(report)?;
    env.show(&data, |r| templates::render_value(templates::IMPORT_REPORT, "report", r))
}

/// The CLI prints every match unless `--limit` is given.
fn unlimited(input: SearchTasksInput) -> SearchTasksInput {
    SearchTasksInput { limit: Some(input.limit.unwrap_or(usize::MAX)), ..input }
}

fn render_listing(listing: &Value) -> Result<String> {
    let mut ctx = tera::Context::new();
    ctx.insert("tasks", &listing["tasks"]);
    let next = listing["offset"].as_u64().unwrap_or(0) + listing["showing"].as_u64().unwrap_or(0);
    ctx.insert("next_offset", &next);
    ctx.insert("total", &listing["total"]);
    ctx.insert("truncated", &listing["truncated"]);
    templates::render(templates::TASK_LIST, &ctx)
}

fn task_line(verb: &str, task: &Value) -> String {
    format!("{verb} task #{}: {}", task["id"], task["title"].as_str().unwrap_or_default())
}

// === Categories and tags ===

fn run_category_cmd(env: &Env, service: &TaskService, cmd: CategoryCommand) -> Result<CliOutput> {
    match cmd {
        CategoryCommand::Add { name, description, color } => {
            let category =
                handlers::add_category(service, AddCategoryInput { name, description, color })?;
            env.show(&category, |c| Ok(named_line("Added category", c)))
        }
        CategoryCommand::List => {
            let categories = handlers::list_categories(service, NoInput {})?;
            env.show(&categories, |list| Ok(counted_lines(list, "No categories.")))
        }
        CategoryCommand::Update { category, name, description, color } => {
            let input = UpdateCategoryInput { category, name, description, color };
            let category = handlers::update_category(service, input)?;
            env.show(&category, |c| Ok(named_line("Updated category", c)))
        }
        CategoryCommand::Delete { category } => {
            let deleted = handlers::delete_category(service, CategoryInput { category })?;
            env.show(&deleted, |d| {
                Ok(format!(
                    "{} ({} task(s) now uncategorized)",
                    named_line("Deleted category", &d["deleted"]),
                    d["tasks_uncategorized"]
                ))
            })
        }
    }
}

fn run_tag_cmd(env: &Env, service: &TaskService, cmd: TagCommand) -> Result<CliOutput> {
    match cmd {
        TagCommand::Add { name, color } => {
            let tag = handlers::add_tag(service, AddTagInput { name, color })?;
            env.show(&tag, |t| Ok(named_line("Added tag", t)))
        }
        TagCommand::List => {
            let tags = handlers::list_tags(service, NoInput {})?;
            env.show(&tags, |list| Ok(counted_lines(list, "No tags.")))
        }
        TagCommand::Update { tag, name, color } => {
            let tag = handlers::update_tag(service, UpdateTagInput { tag, name, color })?;
            env.show(&tag, |t| Ok(named_line("Updated tag", t)))
        }
        TagCommand::Delete { tag } => {
            let deleted = handlers::delete_tag(service, TagInput { tag })?;
            env.show(&deleted, |d| {
                Ok(format!(
                    "{} (removed from {} task(s))",
                    named_line("Deleted tag", &d["deleted"]),
                    d["tasks_untagged"]
                ))
            })
        }
        TagCommand::Attach { task_id, tag } => {
            let task = handlers::tag_task(service, TaskTagInput { task_id, tag })?;
            env.show(&task, |t| Ok(task_line("Tagged", t)))
        }
        TagCommand::Detach { task_id, tag } => {
            let task = handlers::untag_task(service, TaskTagInput { task_id, tag })?;
            env.show(&task, |t| Ok(task_line("Untagged", t)))
        }
    }
}

fn named_line(verb: &str, item: &Value) -> String {
    format!("{verb} #{}: {}", item["id"], item["name"].as_str().unwrap_or_default())
}

fn counted_lines(list: &Value, empty: &str) -> String {
    let lines: Vec<String> = list
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    format!(
                        "#{} {} ({} task(s))",
                        item["id"],
                        item["name"].as_str().unwrap_or_default(),
                        item["task_count"]
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    if lines.is_empty() {
        empty.to_string()
    } else {
        lines.join("\n")
    }
}

// === Config ===

fn run_config_cmd(env: &Env, cmd: ConfigCommand) -> Result<CliOutput> {
    let path = env.config_path()?;
    match cmd {
        ConfigCommand::Show => {
            let config = AppConfig::load_or_default(&path)?;
            let chat = resolve_chat(&ChatOverrides::default(), &config.chat);
            let data = json!({
                "config_path": path,
                "database": env.db_path(&config).ok(),
                "chat": {
                    "api_key": config.chat.api_key.as_deref().map(mask_secret),
                    "base_url": chat.base_url,
                    "model": chat.model,
                    "model_source": chat.model_source,
                    "backend": chat.backend,
                },
            });
            env.show(&data, |d| {
                let text = |v: &Value| v.as_str().map_or_else(|| "(not set)".to_string(), String::from);
                Ok([
                    format!("Config file: {}", text(&d["config_path"])),
                    format!("Database:    {}", text(&d["database"])),
                    format!("API key:     {}", text(&d["chat"]["api_key"])),
                    format!("Base URL:    {}", text(&d["chat"]["base_url"])),
                    format!("Model:       {} ({})", text(&d["chat"]["model"]), text(&d["chat"]["model_source"])),
                    format!("Backend:     {}", text(&d["chat"]["backend"])),
                ]
                .join("\n"))
            })
        }
        ConfigCommand::Set { api_key, base_url, model, backend, database } => {
            let backend = backend.as_deref().map(Backend::from_str).transpose()?;
            let update = ChatConfig {
                api_key,
                base_url,
                model,
                backend: backend.map(|b| b.as_str().to_string()),
            };
            let mut config = AppConfig::load_or_default(&path)?;
            let changed_chat = config.set_chat(update);
            if database.is_none() && !changed_chat {
                return Err(Error::validation("No changes specified"));
            }
            if database.is_some() {
                config.database = database;
            }
            config.save_to(&path)?;
            Ok(success_output(format!("Saved settings to {}", path.display())))
        }
        ConfigCommand::Reset => {
            let mut config = AppConfig::load_or_default(&path)?;
            config.reset_chat();
            config.save_to(&path)?;
            Ok(success_output("Assistant settings cleared".to_string()))
        }
    }
}

// === Assistant ===

fn run_assistant_cmd(env: &Env, cmd: AssistantCommand) -> Result<CliOutput> {
    match cmd {
        AssistantCommand::Backends => {
            let credentials = Credentials::from_env();
            let data: Vec<Value> = Backend::PRIORITY
                .iter()
                .map(|b| {
                    json!({
                        "backend": b,
                        "name": b.display_name(),
                        "env_var": b.env_var(),
                        "available": credentials.has(*b),
                        "default_model": b.default_model(),
                    })
                })
                .collect();
            env.show(&Value::Array(data), |list| {
                let lines = list.as_array().into_iter().flatten().enumerate().map(|(i, b)| {
                    let mark = if b["available"] == true { "available" } else { "no key" };
                    format!(
                        "{}. {} [{}] {} ({}, default model {})",
                        i + 1,
                        b["name"].as_str().unwrap_or_default(),
                        b["backend"].as_str().unwrap_or_default(),
                        mark,
                        b["env_var"].as_str().unwrap_or_default(),
                        b["default_model"].as_str().unwrap_or_default(),
                    )
                });
                Ok(lines.collect::<Vec<_>>().join("\n"))
            })
        }
        AssistantCommand::Select { backend, api_key, base_url, model } => {
            let config = env.load_config()?;
            let overrides = ChatOverrides { api_key, base_url, model, backend };
            let chat = resolve_chat(&overrides, &config.chat);
            let selection = select_for_chat(&chat, &Credentials::from_env())?;
            let data = serde_json::to_value(&selection)?;
            env.show(&data, |_| {
                let mut line = format!(
                    "{} with model {}",
                    selection.backend.display_name(),
                    selection.model
                );
                if selection.credentials_missing {
                    line.push_str(&format!(
                        " (no API key found; set {} or run `todo config set --api-key`)",
                        selection.backend.env_var()
                    ));
                }
                Ok(line)
            })
        }
        AssistantCommand::Tools { domains } => {
            let domains = if domains.is_empty() {
                ToolDomain::ALL.to_vec()
            } else {
                domains.iter().map(|d| ToolDomain::from_str(d)).collect::<Result<Vec<_>>>()?
            };
            let defs = definitions(&domains);
            let data = serde_json::to_value(&defs)?;
            env.show(&data, |_| {
                Ok(defs
                    .iter()
                    .map(|d| {
                        let access = if d.read_only { "read" } else { "write" };
                        format!("{:<18} [{}, {}] {}", d.name, d.domain, access, d.description)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            })
        }
    }
}

// === Output helpers ===

fn json_output(value: &Value) -> Result<CliOutput> {
    Ok(success_output(serde_json::to_string_pretty(value)?))
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(error: &Error) -> CliOutput {
    CliOutput {
        exit_code: ExitCode::from(error.kind().exit_code()),
        stdout: vec![],
        stderr: vec![format!("Error: {error}")],
    }
}
