//! Export and import of tasks as JSON or CSV.
//!
//! An export carries every task field plus its category and tag names, so
//! importing it into an empty database reproduces the same tasks.

use crate::error::{Error, Result};
use crate::tasks::dates::{parse_datetime, to_storage};
use crate::tasks::models::{Priority, Status, TaskDetails};
use crate::tasks::query::TaskQuery;
use crate::tasks::service::TaskService;
use crate::tasks::store::{Session, TaskDraft};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Column order of CSV exports.
pub const CSV_COLUMNS: [&str; 12] = [
    "id",
    "title",
    "description",
    "status",
    "priority",
    "created_at",
    "updated_at",
    "started_at",
    "due_at",
    "completed_at",
    "category",
    "tags",
];

/// Separator between tag names inside the CSV `tags` column.
const TAG_SEPARATOR: &str = ";";

/// Serialization format for exports and imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// A JSON array of records.
    #[default]
    Json,
    /// CSV with a header row.
    Csv,
}

impl ExportFormat {
    /// Parse a format name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything but `json` or `csv`.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::validation(format!("unsupported format '{other}': use json or csv"))),
        }
    }

    /// Detect the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the extension is missing or unknown.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_str(ext).map_err(|_| {
            Error::validation(format!("cannot detect format of {}; pass --format", path.display()))
        })
    }

    /// The format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One exported task, with references by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Id in the exporting database. Ignored on import.
    #[serde(default)]
    pub id: Option<i64>,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Status.
    #[serde(default)]
    pub status: Status,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Creation time; import time when absent.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time; `created_at` when absent.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Start time.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Due date.
    #[serde(default, alias = "due_date")]
    pub due_at: Option<DateTime<Utc>>,
    /// Completion time.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&TaskDetails> for TaskRecord {
    fn from(details: &TaskDetails) -> Self {
        let task = &details.task;
        Self {
            id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            created_at: Some(task.created_at),
            updated_at: Some(task.updated_at),
            started_at: task.started_at,
            due_at: task.due_at,
            completed_at: task.completed_at,
            category: details.category.as_ref().map(|c| c.name.clone()),
            tags: details.tags.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Import behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Run every check but keep nothing.
    pub dry_run: bool,
    /// Skip records whose title already exists.
    pub skip_existing: bool,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Tasks written (or that would be, for a dry run).
    pub imported: usize,
    /// Records skipped because the title existed.
    pub skipped: usize,
    /// Categories created for unknown names.
    pub categories_created: usize,
    /// Tags created for unknown names.
    pub tags_created: usize,
    /// Whether nothing was kept.
    pub dry_run: bool,
}

/// Collect the tasks selected by `query` as records.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn export_records(
    service: &TaskService,
    query: &TaskQuery,
    include_completed: bool,
) -> Result<Vec<TaskRecord>> {
    let mut tasks = service.search(query)?;
    if !include_completed {
        tasks.retain(|d| d.task.status != Status::Completed);
    }
    Ok(tasks.iter().map(TaskRecord::from).collect())
}

/// Export the tasks selected by `query` in `format`.
///
/// # Errors
///
/// Returns an error on database or serialization failure.
pub fn export(
    service: &TaskService,
    query: &TaskQuery,
    include_completed: bool,
    format: ExportFormat,
) -> Result<String> {
    let records = export_records(service, query, include_completed)?;
    info!(count = records.len(), %format, "exporting tasks");
    render(&records, format)
}

/// Serialize records.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(records: &[TaskRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        ExportFormat::Csv => {
            let mut out = csv_row(CSV_COLUMNS.iter().copied());
            out.push('\n');
            for record in records {
                out.push_str(&csv_row(record_fields(record).iter().map(String::as_str)));
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn record_fields(record: &TaskRecord) -> [String; 12] {
    let ts = |dt: Option<DateTime<Utc>>| dt.map(to_storage).unwrap_or_default();
    [
        record.id.map(|id| id.to_string()).unwrap_or_default(),
        record.title.clone(),
        record.description.clone().unwrap_or_default(),
        record.status.as_str().to_string(),
        record.priority.as_str().to_string(),
        ts(record.created_at),
        ts(record.updated_at),
        ts(record.started_at),
        ts(record.due_at),
        ts(record.completed_at),
        record.category.clone().unwrap_or_default(),
        record.tags.join(TAG_SEPARATOR),
    ]
}

/// Parse records from exported text. Dates are resolved against `now`.
///
/// # Errors
///
/// Returns a validation error naming the first malformed record.
pub fn parse(text: &str, format: ExportFormat, now: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
    match format {
        ExportFormat::Json => {
            let values: Vec<serde_json::Value> = serde_json::from_str(text)
                .map_err(|e| Error::validation(format!("expected a JSON array of tasks: {e}")))?;
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    serde_json::from_value(value)
                        .map_err(|e| Error::validation(format!("record {}: {e}", index + 1)))
                })
                .collect()
        }
        ExportFormat::Csv => {
            let mut rows = parse_csv(text)?.into_iter();
            let Some(header) = rows.next() else {
                return Ok(Vec::new());
            };
            let columns: HashMap<String, usize> = header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_lowercase(), i))
                .collect();
            if !columns.contains_key("title") {
                return Err(Error::validation("CSV header has no 'title' column"));
            }
            rows.enumerate()
                .map(|(index, row)| {
                    record_from_row(&columns, &row, now).map_err(|e| at_record(index + 1, e))
                })
                .collect()
        }
    }
}

fn record_from_row(
    columns: &HashMap<String, usize>,
    row: &[String],
    now: DateTime<Utc>,
) -> Result<TaskRecord> {
    let raw = |name: &str| columns.get(name).and_then(|&i| row.get(i)).map(String::as_str);
    let cell = |name: &str| raw(name).map(str::trim).filter(|s| !s.is_empty());
    let ts = |name: &str| cell(name).map(|s| parse_datetime(s, now)).transpose();

    Ok(TaskRecord {
        id: cell("id")
            .map(|s| s.parse().map_err(|_| Error::validation(format!("invalid id '{s}'"))))
            .transpose()?,
        title: cell("title").unwrap_or_default().to_string(),
        // Only blank-ness is checked; the text itself round-trips untouched.
        description: raw("description").filter(|s| !s.trim().is_empty()).map(ToString::to_string),
        status: cell("status").map(Status::from_str).transpose()?.unwrap_or_default(),
        priority: cell("priority").map(Priority::from_str).transpose()?.unwrap_or_default(),
        created_at: ts("created_at")?,
        updated_at: ts("updated_at")?,
        started_at: ts("started_at")?,
        due_at: if columns.contains_key("due_at") { ts("due_at")? } else { ts("due_date")? },
        completed_at: ts("completed_at")?,
        category: cell("category").map(ToString::to_string),
        tags: cell("tags")
            .map(|s| {
                s.split(TAG_SEPARATOR)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// Import records in one transaction.
///
/// Unknown categories and tags are created. Status and timestamps are taken
/// from the record as-is, subject to the store's consistency checks.
///
/// # Errors
///
/// Returns a validation error naming the first malformed record; nothing is
/// kept in that case.
pub fn import(
    service: &TaskService,
    records: &[TaskRecord],
    options: ImportOptions,
) -> Result<ImportReport> {
    let now = service.now();
    let run = |s: &Session<'_>| import_into(s, records, options, now);
    let report = if options.dry_run {
        service.store().rehearse(run)?
    } else {
        service.store().write(run)?
    };
    info!(
        imported = report.imported,
        skipped = report.skipped,
        dry_run = report.dry_run,
        "import finished"
    );
    Ok(report)
}

fn import_into(
    s: &Session<'_>,
    records: &[TaskRecord],
    options: ImportOptions,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let mut report = ImportReport { dry_run: options.dry_run, ..ImportReport::default() };
    for (index, record) in records.iter().enumerate() {
        if options.skip_existing && s.task_title_exists(record.title.trim())? {
            report.skipped += 1;
            continue;
        }
        import_record(s, record, now, &mut report).map_err(|e| at_record(index + 1, e))?;
        report.imported += 1;
    }
    Ok(report)
}

fn import_record(
    s: &Session<'_>,
    record: &TaskRecord,
    now: DateTime<Utc>,
    report: &mut ImportReport,
) -> Result<()> {
    let category_id = match record.category.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => Some(match s.find_category_by_name(name)? {
            Some(category) => category.id,
            None => {
                report.categories_created += 1;
                s.insert_category(name, None, None)?.id
            }
        }),
        None => None,
    };

    let created_at = record.created_at.unwrap_or(now);
    let draft = TaskDraft {
        title: record.title.clone(),
        description: record.description.clone(),
        status: record.status,
        priority: record.priority,
        category_id,
        created_at,
        updated_at: record.updated_at.unwrap_or(created_at),
        started_at: record.started_at,
        due_at: record.due_at,
        completed_at: record.completed_at,
    };
    let task = s.insert_task(&draft)?;

    let mut seen = BTreeSet::new();
    for name in record.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !seen.insert(name) {
            continue;
        }
        let tag = match s.find_tag_by_name(name)? {
            Some(tag) => tag,
            None => {
                report.tags_created += 1;
                s.insert_tag(name, None)?
            }
        };
        s.attach_tag(task.id, tag.id)?;
    }
    Ok(())
}

fn at_record(number: usize, error: Error) -> Error {
    match error {
        Error::Validation(message) => Error::validation(format!("record {number}: {message}")),
        other => other,
    }
}

// === CSV ===

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",")
}

/// Split CSV text into rows of fields. Blank lines are skipped.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::validation(format!(
            "unterminated quoted CSV field starting on line {quote_line}"
        )));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }
    Ok(rows)
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }
}
