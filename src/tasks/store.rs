//! `SQLite` entity store for tasks, categories and tags.
//!
//! Every operation runs inside a [`Session`]: a connection plus a transaction
//! opened by [`SqliteTaskStore::read`] or [`SqliteTaskStore::write`]. The
//! transaction commits when the closure returns `Ok` and rolls back when it
//! returns `Err` or unwinds, so a multi-row write never leaves partial state.

use crate::error::{is_unique_violation, Error, Result};
use crate::tasks::dates::{from_storage, to_storage};
use crate::tasks::models::{
    non_blank, validate_color, validate_name, validate_title, Category, Priority, Status, Tag,
    Task, TaskDetails, WithCount,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits for a competing writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Column list matching [`Session::parse_task`].
pub(crate) const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, \
     t.category_id, t.created_at, t.updated_at, t.started_at, t.due_at, t.completed_at";

/// A reference to a category by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    /// Match by id.
    Id(i64),
    /// Match by exact name.
    Name(String),
    /// All-digit input: the category with this name, otherwise the one with
    /// this id.
    NameOrId(String, i64),
}

impl CategoryRef {
    /// Interpret user input. Names always win, so a category named "2024"
    /// stays reachable; all-digit input falls back to an id.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse() {
            Ok(id) if input.bytes().all(|b| b.is_ascii_digit()) => {
                Self::NameOrId(input.to_string(), id)
            }
            _ => Self::Name(input.to_string()),
        }
    }
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) | Self::NameOrId(name, _) => write!(f, "{name}"),
        }
    }
}

/// All stored fields of a task that is about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title (validated on insert).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Initial status.
    pub status: Status,
    /// Priority.
    pub priority: Priority,
    /// Category reference.
    pub category_id: Option<i64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Due date.
    pub due_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// A fresh pending task created at `now`.
    #[must_use]
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: Status::Pending,
            priority: Priority::default(),
            category_id: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            due_at: None,
            completed_at: None,
        }
    }
}

/// User-editable task fields. `None` leaves a field unchanged.
///
/// For nullable columns the inner `Option` distinguishes "clear" from "set".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear.
    pub description: Option<Option<String>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New category, or `Some(None)` to clear.
    pub category_id: Option<Option<i64>>,
    /// New due date, or `Some(None)` to clear.
    pub due_at: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.category_id.is_none()
            && self.due_at.is_none()
    }
}

/// Lifecycle fields written by transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    /// New status.
    pub status: Status,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields that can be updated on a category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategoryUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description, or `Some(None)` to clear.
    pub description: Option<Option<String>>,
    /// New color, or `Some(None)` to clear.
    pub color: Option<Option<String>>,
}

impl CategoryUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }
}

/// Fields that can be updated on a tag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    /// New name.
    pub name: Option<String>,
    /// New color, or `Some(None)` to clear.
    pub color: Option<Option<String>>,
}

impl TagUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

/// SQLite-based entity store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    /// Create a new `SQLite` store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf() };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the database.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                color TEXT
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                color TEXT
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                description TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'in_progress', 'completed')),
                priority TEXT NOT NULL DEFAULT 'medium'
                    CHECK (priority IN ('low', 'medium', 'high')),
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                started_at TEXT,
                due_at TEXT,
                completed_at TEXT,
                CHECK (completed_at IS NULL OR status = 'completed')
            );

            -- Many-to-many; removing either side removes the link only
            CREATE TABLE IF NOT EXISTS task_tags (
                task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (task_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority);
            CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at, id);
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_at);
            CREATE INDEX IF NOT EXISTS idx_task_tags_tag ON task_tags(tag_id);
            ",
        )?;

        Ok(())
    }

    /// Run `f` in a read transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or `f` fails.
    pub fn read<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&Session { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` in a write transaction.
    ///
    /// The write lock is taken up front so concurrent writers serialize
    /// instead of failing on upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or `f` fails; in
    /// the latter case nothing `f` wrote is kept.
    pub fn write<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&Session { conn: &tx }) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "rolling back write transaction");
                Err(e)
            }
        }
    }

    /// Run `f` in a write transaction that is always rolled back.
    ///
    /// Lets a batch run every check a real write would, without keeping it.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or `f` fails.
    pub fn rehearse<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&Session { conn: &tx })?;
        tx.rollback()?;
        Ok(value)
    }
}

/// Entity operations bound to one open transaction.
pub struct Session<'c> {
    conn: &'c Connection,
}

fn ts_err(idx: usize, e: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn get_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    from_storage(&text).map_err(|e| ts_err(idx, e))
}

fn get_opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| from_storage(&t).map_err(|e| ts_err(idx, e))).transpose()
}

fn opt_ts(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(to_storage)
}

/// Timestamps must respect the lifecycle: completion implies the completed
/// status, and nothing completes before it starts.
fn check_state(state: &TaskState, created_at: Option<DateTime<Utc>>) -> Result<()> {
    if state.completed_at.is_some() != (state.status == Status::Completed) {
        return Err(Error::validation("completed_at must be set exactly when status is completed"));
    }
    if state.status == Status::InProgress && state.started_at.is_none() {
        return Err(Error::validation("in-progress tasks must have started_at"));
    }
    if let (Some(started), Some(completed)) = (state.started_at, state.completed_at) {
        if started > completed {
            return Err(Error::validation("started_at must not be after completed_at"));
        }
    }
    if let (Some(created), Some(started)) = (created_at, state.started_at) {
        if started < created {
            return Err(Error::validation("started_at must not be before created_at"));
        }
    }
    Ok(())
}

impl Session<'_> {
    /// The underlying connection, for the query engine.
    pub(crate) const fn conn(&self) -> &Connection {
        self.conn
    }

    /// Parse a task from a row selected with [`TASK_COLUMNS`].
    pub(crate) fn parse_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let status_str: String = row.get(3)?;
        let priority_str: String = row.get(4)?;

        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: Status::from_str(&status_str)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
            priority: Priority::from_str(&priority_str)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
            category_id: row.get(5)?,
            created_at: get_ts(row, 6)?,
            updated_at: get_ts(row, 7)?,
            started_at: get_opt_ts(row, 8)?,
            due_at: get_opt_ts(row, 9)?,
            completed_at: get_opt_ts(row, 10)?,
        })
    }

    fn parse_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
        })
    }

    fn parse_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag { id: row.get(0)?, name: row.get(1)?, color: row.get(2)? })
    }

    // === Tasks ===

    /// Insert a task. The store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title or inconsistent
    /// timestamps, and not-found if the category does not exist.
    pub fn insert_task(&self, draft: &TaskDraft) -> Result<Task> {
        let title = validate_title(&draft.title)?;
        let state = TaskState {
            status: draft.status,
            started_at: draft.started_at,
            completed_at: draft.completed_at,
        };
        check_state(&state, Some(draft.created_at))?;
        if let Some(category_id) = draft.category_id {
            self.get_category(category_id)?;
        }

        self.conn.execute(
            "INSERT INTO tasks (title, description, status, priority, category_id,
                                created_at, updated_at, started_at, due_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                title,
                non_blank(draft.description.as_deref()),
                draft.status.as_str(),
                draft.priority.as_str(),
                draft.category_id,
                to_storage(draft.created_at),
                to_storage(draft.updated_at),
                opt_ts(draft.started_at),
                opt_ts(draft.due_at),
                opt_ts(draft.completed_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(task_id = id, "inserted task");
        self.get_task(id)
    }

    /// Get a task by id, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn find_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1"),
                params![id],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Get a task by id.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn get_task(&self, id: i64) -> Result<Task> {
        self.find_task(id)?.ok_or_else(|| Error::not_found("task", id))
    }

    /// Apply user-editable field changes.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing task or category, and a validation
    /// error for an empty title.
    pub fn update_task(
        &self,
        id: i64,
        update: &TaskUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Task> {
        self.get_task(id)?;

        let mut updates = vec!["updated_at = ?"];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(to_storage(updated_at))];

        if let Some(ref title) = update.title {
            updates.push("title = ?");
            values.push(Box::new(validate_title(title)?));
        }
        if let Some(ref description) = update.description {
            updates.push("description = ?");
            values.push(Box::new(non_blank(description.as_deref())));
        }
        if let Some(priority) = update.priority {
            updates.push("priority = ?");
            values.push(Box::new(priority.as_str()));
        }
        if let Some(category_id) = update.category_id {
            if let Some(category_id) = category_id {
                self.get_category(category_id)?;
            }
            updates.push("category_id = ?");
            values.push(Box::new(category_id));
        }
        if let Some(due_at) = update.due_at {
            updates.push("due_at = ?");
            values.push(Box::new(opt_ts(due_at)));
        }

        values.push(Box::new(id));
        let sql = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        self.conn.execute(&sql, params.as_slice())?;

        self.get_task(id)
    }

    /// Write lifecycle fields.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing task and a validation error if the
    /// timestamps are inconsistent with the status.
    pub fn set_state(&self, id: i64, state: &TaskState, updated_at: DateTime<Utc>) -> Result<Task> {
        let current = self.get_task(id)?;
        check_state(state, Some(current.created_at))?;
        self.conn.execute(
            "UPDATE tasks SET status = ?1, started_at = ?2, completed_at = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                state.status.as_str(),
                opt_ts(state.started_at),
                opt_ts(state.completed_at),
                to_storage(updated_at),
                id
            ],
        )?;
        self.get_task(id)
    }

    /// Bump `updated_at` without other changes.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn touch_task(&self, id: i64, updated_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET updated_at = ?1 WHERE id = ?2",
            params![to_storage(updated_at), id],
        )?;
        Ok(())
    }

    /// Delete a task, returning it. Tag links go with it; tags stay.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn delete_task(&self, id: i64) -> Result<Task> {
        let task = self.get_task(id)?;
        self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        debug!(task_id = id, "deleted task");
        Ok(task)
    }

    /// All tasks, oldest first, ties by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t ORDER BY t.created_at ASC, t.id ASC"
        ))?;
        let tasks = stmt.query_map([], Self::parse_task)?.collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    /// Whether a task with exactly this title exists.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn task_title_exists(&self, title: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE title = ?1)",
            params![title.trim()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Resolve the category and tags of one task.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn details(&self, task: Task) -> Result<TaskDetails> {
        let category = match task.category_id {
            Some(id) => self.find_category(id)?,
            None => None,
        };
        let tags = self.tags_for_task(task.id)?;
        Ok(TaskDetails { task, category, tags })
    }

    /// Resolve categories and tags for many tasks, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn details_many(&self, tasks: Vec<Task>) -> Result<Vec<TaskDetails>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let categories: HashMap<i64, Category> = self
            .list_categories()?
            .into_iter()
            .map(|c| (c.item.id, c.item))
            .collect();

        let mut tags_by_task: HashMap<i64, Vec<Tag>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT tt.task_id, g.id, g.name, g.color
             FROM task_tags tt JOIN tags g ON g.id = tt.tag_id
             ORDER BY g.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, Tag { id: row.get(1)?, name: row.get(2)?, color: row.get(3)? }))
        })?;
        for row in rows {
            let (task_id, tag) = row?;
            tags_by_task.entry(task_id).or_default().push(tag);
        }

        Ok(tasks
            .into_iter()
            .map(|task| {
                let category = task.category_id.and_then(|id| categories.get(&id).cloned());
                let tags = tags_by_task.remove(&task.id).unwrap_or_default();
                TaskDetails { task, category, tags }
            })
            .collect())
    }

    // === Categories ===

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name or color and a conflict if
    /// the name is taken.
    pub fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category> {
        let name = validate_name("category", name)?;
        let color = color.map(validate_color).transpose()?;
        self.conn
            .execute(
                "INSERT INTO categories (name, description, color) VALUES (?1, ?2, ?3)",
                params![name, non_blank(description), color],
            )
            .map_err(|e| conflict_or(e, "category", &name))?;
        self.get_category(self.conn.last_insert_rowid())
    }

    /// Get a category by id, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn find_category(&self, id: i64) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, description, color FROM categories WHERE id = ?1",
                params![id],
                Self::parse_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn get_category(&self, id: i64) -> Result<Category> {
        self.find_category(id)?.ok_or_else(|| Error::not_found("category", id))
    }

    /// Get a category by exact name, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, description, color FROM categories WHERE name = ?1",
                params![name.trim()],
                Self::parse_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Resolve a category reference.
    ///
    /// # Errors
    ///
    /// Returns not-found if no category matches.
    pub fn resolve_category(&self, reference: &CategoryRef) -> Result<Category> {
        match reference {
            CategoryRef::Id(id) => self.get_category(*id),
            CategoryRef::Name(name) => self
                .find_category_by_name(name)?
                .ok_or_else(|| Error::not_found("category", name)),
            CategoryRef::NameOrId(name, id) => match self.find_category_by_name(name)? {
                Some(category) => Ok(category),
                None => self.find_category(*id)?.ok_or_else(|| Error::not_found("category", name)),
            },
        }
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns not-found, validation or conflict errors.
    pub fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<Category> {
        let current = self.get_category(id)?;
        let name = match update.name {
            Some(ref name) => validate_name("category", name)?,
            None => current.name,
        };
        let description = match update.description {
            Some(ref d) => non_blank(d.as_deref()),
            None => current.description,
        };
        let color = match update.color {
            Some(Some(ref c)) => Some(validate_color(c)?),
            Some(None) => None,
            None => current.color,
        };
        self.conn
            .execute(
                "UPDATE categories SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
                params![name, description, color, id],
            )
            .map_err(|e| conflict_or(e, "category", &name))?;
        self.get_category(id)
    }

    /// Delete a category. Tasks keep existing with their category cleared.
    ///
    /// Returns the deleted category and the number of tasks that referenced it.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn delete_category(&self, id: i64) -> Result<(Category, i64)> {
        let category = self.get_category(id)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        self.conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        debug!(category_id = id, detached = count, "deleted category");
        Ok((category, count))
    }

    /// All categories by name, with task counts.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list_categories(&self) -> Result<Vec<WithCount<Category>>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.description, c.color,
                    (SELECT COUNT(*) FROM tasks t WHERE t.category_id = c.id)
             FROM categories c ORDER BY c.name ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WithCount { item: Self::parse_category(row)?, task_count: row.get(4)? })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    // === Tags ===

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name or color and a conflict if
    /// the name is taken.
    pub fn insert_tag(&self, name: &str, color: Option<&str>) -> Result<Tag> {
        let name = validate_name("tag", name)?;
        let color = color.map(validate_color).transpose()?;
        self.conn
            .execute("INSERT INTO tags (name, color) VALUES (?1, ?2)", params![name, color])
            .map_err(|e| conflict_or(e, "tag", &name))?;
        self.get_tag(self.conn.last_insert_rowid())
    }

    /// Get a tag by id.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn get_tag(&self, id: i64) -> Result<Tag> {
        self.conn
            .query_row("SELECT id, name, color FROM tags WHERE id = ?1", params![id], Self::parse_tag)
            .optional()?
            .ok_or_else(|| Error::not_found("tag", id))
    }

    /// Get a tag by exact name, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name, color FROM tags WHERE name = ?1",
                params![name.trim()],
                Self::parse_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Get a tag by exact name.
    ///
    /// # Errors
    ///
    /// Returns not-found if no tag has this name.
    pub fn resolve_tag(&self, name: &str) -> Result<Tag> {
        self.find_tag_by_name(name)?.ok_or_else(|| Error::not_found("tag", name))
    }

    /// Update a tag.
    ///
    /// # Errors
    ///
    /// Returns not-found, validation or conflict errors.
    pub fn update_tag(&self, id: i64, update: &TagUpdate) -> Result<Tag> {
        let current = self.get_tag(id)?;
        let name = match update.name {
            Some(ref name) => validate_name("tag", name)?,
            None => current.name,
        };
        let color = match update.color {
            Some(Some(ref c)) => Some(validate_color(c)?),
            Some(None) => None,
            None => current.color,
        };
        self.conn
            .execute(
                "UPDATE tags SET name = ?1, color = ?2 WHERE id = ?3",
                params![name, color, id],
            )
            .map_err(|e| conflict_or(e, "tag", &name))?;
        self.get_tag(id)
    }

    /// Delete a tag, detaching it from every task.
    ///
    /// Returns the deleted tag and the number of tasks it was attached to.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn delete_tag(&self, id: i64) -> Result<(Tag, i64)> {
        let tag = self.get_tag(id)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM task_tags WHERE tag_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        self.conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        debug!(tag_id = id, detached = count, "deleted tag");
        Ok((tag, count))
    }

    /// All tags by name, with task counts.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list_tags(&self) -> Result<Vec<WithCount<Tag>>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.name, g.color,
                    (SELECT COUNT(*) FROM task_tags tt WHERE tt.tag_id = g.id)
             FROM tags g ORDER BY g.name ASC",
        )?;
        let rows = stmt
            .query_map([], |row| Ok(WithCount { item: Self::parse_tag(row)?, task_count: row.get(3)? }))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    // === Task/tag links ===

    /// Attach a tag to a task.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing task or tag and a conflict if the tag
    /// is already attached.
    pub fn attach_tag(&self, task_id: i64, tag_id: i64) -> Result<()> {
        self.get_task(task_id)?;
        let tag = self.get_tag(tag_id)?;
        self.conn
            .execute(
                "INSERT INTO task_tags (task_id, tag_id) VALUES (?1, ?2)",
                params![task_id, tag_id],
            )
            .map_err(|e| conflict_or(e, "tag assignment", &format!("{} on task {task_id}", tag.name)))?;
        Ok(())
    }

    /// Detach a tag from a task.
    ///
    /// # Errors
    ///
    /// Returns not-found if the task, the tag, or the link is missing.
    pub fn detach_tag(&self, task_id: i64, tag_id: i64) -> Result<()> {
        self.get_task(task_id)?;
        let tag = self.get_tag(tag_id)?;
        let rows = self.conn.execute(
            "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id = ?2",
            params![task_id, tag_id],
        )?;
        if rows == 0 {
            return Err(Error::not_found("tag assignment", format!("{} on task {task_id}", tag.name)));
        }
        Ok(())
    }

    /// Replace all tags on a task.
    ///
    /// # Errors
    ///
    /// Returns not-found for missing entities and a conflict if `tag_ids`
    /// contains duplicates.
    pub fn replace_tags(&self, task_id: i64, tag_ids: &[i64]) -> Result<()> {
        self.get_task(task_id)?;
        self.conn.execute("DELETE FROM task_tags WHERE task_id = ?1", params![task_id])?;
        for tag_id in tag_ids {
            self.attach_tag(task_id, *tag_id)?;
        }
        Ok(())
    }

    /// Tags attached to a task, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_for_task(&self, task_id: i64) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.name, g.color FROM tags g
             JOIN task_tags tt ON tt.tag_id = g.id
             WHERE tt.task_id = ?1 ORDER BY g.name ASC",
        )?;
        let tags = stmt.query_map(params![task_id], Self::parse_tag)?.collect::<rusqlite::Result<_>>()?;
        Ok(tags)
    }
}

/// Translate a UNIQUE violation into a conflict; pass everything else through.
fn conflict_or(err: rusqlite::Error, entity: &'static str, name: &str) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict { entity, name: name.to_string() }
    } else {
        Error::Database(err)
    }
}
