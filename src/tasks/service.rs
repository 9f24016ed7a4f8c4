//! Task lifecycle service: the only writer of task state.
//!
//! Each public operation opens exactly one store transaction and closes it
//! before returning.

use crate::error::{Error, Result};
use crate::tasks::clock::{Clock, SystemClock};
use crate::tasks::dates::storage_precision;
use crate::tasks::models::{Category, Priority, Status, Tag, Task, TaskDetails, WithCount};
use crate::tasks::query::{self, TaskQuery, TaskStats};
use crate::tasks::store::{
    CategoryRef, CategoryUpdate, Session, SqliteTaskStore, TagUpdate, TaskDraft, TaskState,
    TaskUpdate,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title (required, non-empty).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Priority; medium when unset.
    pub priority: Option<Priority>,
    /// Existing category.
    pub category: Option<CategoryRef>,
    /// Names of existing tags.
    pub tags: Vec<String>,
    /// Optional due date.
    pub due_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A task with just a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

/// A requested change to a task.
///
/// `status` and the derived timestamps are listed so that callers asking for
/// them get a clear rejection; only `due_at` among the dates is editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// New title.
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear.
    pub description: Option<Option<String>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New category, or `Some(None)` to clear.
    pub category: Option<Option<CategoryRef>>,
    /// New due date, or `Some(None)` to clear.
    pub due_at: Option<Option<DateTime<Utc>>>,
    /// Replacement tag set.
    pub tags: Option<Vec<String>>,
    /// Rejected: use `start_task` / `complete_task`.
    pub status: Option<Status>,
    /// Rejected: set at creation.
    pub created_at: Option<DateTime<Utc>>,
    /// Rejected: set by `start_task`.
    pub started_at: Option<DateTime<Utc>>,
    /// Rejected: set by `complete_task`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskChanges {
    /// Check if any editable or rejected field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_at.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.created_at.is_none()
            && self.started_at.is_none()
            && self.completed_at.is_none()
    }

    fn reject_derived(&self) -> Result<()> {
        if self.status.is_some() {
            return Err(Error::validation(
                "status cannot be set directly; use start_task or complete_task",
            ));
        }
        let derived = [
            ("created_at", self.created_at.is_some()),
            ("started_at", self.started_at.is_some()),
            ("completed_at", self.completed_at.is_some()),
        ];
        if let Some((field, _)) = derived.iter().find(|(_, set)| *set) {
            return Err(Error::validation(format!(
                "{field} is derived and cannot be set; only due_at is editable"
            )));
        }
        Ok(())
    }
}

/// Task, category and tag operations over one store.
#[derive(Clone)]
pub struct TaskService {
    store: SqliteTaskStore,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").field("store", &self.store).finish_non_exhaustive()
    }
}

impl TaskService {
    /// Create a service using the system clock.
    #[must_use]
    pub fn new(store: SqliteTaskStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock.
    #[must_use]
    pub fn with_clock(store: SqliteTaskStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open (creating if needed) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn open(db_path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(SqliteTaskStore::new(db_path)?))
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &SqliteTaskStore {
        &self.store
    }

    /// The current time, at storage precision.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        storage_precision(self.clock.now())
    }

    // === Tasks ===

    /// Create a task. Status starts as pending.
    ///
    /// The task, its category link and its tag links are written atomically.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title, not-found for an
    /// unknown category or tag, and a conflict for a repeated tag.
    pub fn add_task(&self, new: &NewTask) -> Result<TaskDetails> {
        let now = self.now();
        let details = self.store.write(|s| {
            let mut draft = TaskDraft::new(new.title.clone(), now);
            draft.description.clone_from(&new.description);
            draft.priority = new.priority.unwrap_or_default();
            draft.due_at = new.due_at;
            draft.category_id =
                new.category.as_ref().map(|c| s.resolve_category(c)).transpose()?.map(|c| c.id);

            let task = s.insert_task(&draft)?;
            for name in &new.tags {
                let tag = s.resolve_tag(name)?;
                s.attach_tag(task.id, tag.id)?;
            }
            s.details(task)
        })?;
        info!(task_id = details.task.id, title = %details.task.title, "task added");
        Ok(details)
    }

    /// Get a task with its category and tags.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn get_task(&self, id: i64) -> Result<TaskDetails> {
        self.store.read(|s| s.details(s.get_task(id)?))
    }

    /// Apply field changes to a task.
    ///
    /// # Errors
    ///
    /// Returns a validation error for no changes, for attempts to set status
    /// or derived timestamps, or for an empty title; not-found for unknown
    /// task, category or tags.
    pub fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<TaskDetails> {
        if changes.is_empty() {
            return Err(Error::validation("No changes specified"));
        }
        changes.reject_derived()?;

        let now = self.now();
        self.store.write(|s| {
            let category_id = match &changes.category {
                Some(Some(reference)) => Some(Some(s.resolve_category(reference)?.id)),
                Some(None) => Some(None),
                None => None,
            };
            let update = TaskUpdate {
                title: changes.title.clone(),
                description: changes.description.clone(),
                priority: changes.priority,
                category_id,
                due_at: changes.due_at,
            };
            let task = if update.is_empty() {
                s.get_task(id)?;
                s.touch_task(id, now)?;
                s.get_task(id)?
            } else {
                s.update_task(id, &update, now)?
            };

            if let Some(names) = &changes.tags {
                let tag_ids = resolve_tags(s, names)?;
                s.replace_tags(id, &tag_ids)?;
            }
            s.details(task)
        })
    }

    /// Move a pending task to in progress.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id and invalid-state if the task is
    /// already in progress or completed.
    pub fn start_task(&self, id: i64) -> Result<TaskDetails> {
        let now = self.now();
        let details = self.store.write(|s| {
            let task = s.get_task(id)?;
            if !task.status.can_start() {
                return Err(invalid_state(&task, "start"));
            }
            let state =
                TaskState { status: Status::InProgress, started_at: Some(now), completed_at: None };
            let task = s.set_state(id, &state, now)?;
            s.details(task)
        })?;
        info!(task_id = id, "task started");
        Ok(details)
    }

    /// Complete a task. Pending tasks may be completed directly.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id and invalid-state if the task is
    /// already completed.
    pub fn complete_task(&self, id: i64) -> Result<TaskDetails> {
        let now = self.now();
        let details = self.store.write(|s| {
            let task = s.get_task(id)?;
            if !task.status.can_complete() {
                return Err(invalid_state(&task, "complete"));
            }
            let state = TaskState {
                status: Status::Completed,
                started_at: task.started_at,
                completed_at: Some(now),
            };
            let task = s.set_state(id, &state, now)?;
            s.details(task)
        })?;
        info!(task_id = id, "task completed");
        Ok(details)
    }

    /// Delete a task permanently.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id does not exist.
    pub fn delete_task(&self, id: i64) -> Result<Task> {
        let task = self.store.write(|s| s.delete_task(id))?;
        info!(task_id = id, "task deleted");
        Ok(task)
    }

    /// Attach an existing tag to a task.
    ///
    /// # Errors
    ///
    /// Returns not-found for unknown task or tag and a conflict if already attached.
    pub fn tag_task(&self, id: i64, tag_name: &str) -> Result<TaskDetails> {
        let now = self.now();
        self.store.write(|s| {
            let tag = s.resolve_tag(tag_name)?;
            s.attach_tag(id, tag.id)?;
            s.touch_task(id, now)?;
            s.details(s.get_task(id)?)
        })
    }

    /// Detach a tag from a task.
    ///
    /// # Errors
    ///
    /// Returns not-found for unknown task or tag, or if the tag is not attached.
    pub fn untag_task(&self, id: i64, tag_name: &str) -> Result<TaskDetails> {
        let now = self.now();
        self.store.write(|s| {
            let tag = s.resolve_tag(tag_name)?;
            s.detach_tag(id, tag.id)?;
            s.touch_task(id, now)?;
            s.details(s.get_task(id)?)
        })
    }

    // === Queries ===

    /// Tasks matching `query`, with categories and tags resolved.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure. No matches is `Ok(vec![])`.
    pub fn search(&self, query: &TaskQuery) -> Result<Vec<TaskDetails>> {
        let now = self.now();
        self.store.read(|s| query::search_details(s, query, now))
    }

    /// Statistics over the tasks matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn stats(&self, query: &TaskQuery) -> Result<TaskStats> {
        let now = self.now();
        self.store.read(|s| query::stats(s, query, now))
    }

    // === Categories ===

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns validation errors for a bad name or color and a conflict for a
    /// duplicate name.
    pub fn add_category(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category> {
        let category = self.store.write(|s| s.insert_category(name, description, color))?;
        info!(category_id = category.id, name = %category.name, "category added");
        Ok(category)
    }

    /// Get a category by id or name.
    ///
    /// # Errors
    ///
    /// Returns not-found if it does not exist.
    pub fn get_category(&self, reference: &CategoryRef) -> Result<Category> {
        self.store.read(|s| s.resolve_category(reference))
    }

    /// All categories with task counts.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list_categories(&self) -> Result<Vec<WithCount<Category>>> {
        self.store.read(|s| s.list_categories())
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns a validation error for no changes, plus not-found, validation
    /// and conflict errors from the store.
    pub fn update_category(
        &self,
        reference: &CategoryRef,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        if update.is_empty() {
            return Err(Error::validation("No changes specified"));
        }
        self.store.write(|s| {
            let category = s.resolve_category(reference)?;
            s.update_category(category.id, update)
        })
    }

    /// Delete a category; its tasks keep existing without a category.
    ///
    /// Returns the category and how many tasks lost their reference.
    ///
    /// # Errors
    ///
    /// Returns not-found if it does not exist.
    pub fn delete_category(&self, reference: &CategoryRef) -> Result<(Category, i64)> {
        let result = self.store.write(|s| {
            let category = s.resolve_category(reference)?;
            s.delete_category(category.id)
        })?;
        info!(category_id = result.0.id, detached = result.1, "category deleted");
        Ok(result)
    }

    // === Tags ===

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns validation errors for a bad name or color and a conflict for a
    /// duplicate name.
    pub fn add_tag(&self, name: &str, color: Option<&str>) -> Result<Tag> {
        let tag = self.store.write(|s| s.insert_tag(name, color))?;
        info!(tag_id = tag.id, name = %tag.name, "tag added");
        Ok(tag)
    }

    /// All tags with task counts.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list_tags(&self) -> Result<Vec<WithCount<Tag>>> {
        self.store.read(|s| s.list_tags())
    }

    /// Update a tag by name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for no changes, plus not-found, validation
    /// and conflict errors from the store.
    pub fn update_tag(&self, name: &str, update: &TagUpdate) -> Result<Tag> {
        if update.is_empty() {
            return Err(Error::validation("No changes specified"));
        }
        self.store.write(|s| {
            let tag = s.resolve_tag(name)?;
            s.update_tag(tag.id, update)
        })
    }

    /// Delete a tag by name, detaching it from all tasks.
    ///
    /// # Errors
    ///
    /// Returns not-found if it does not exist.
    pub fn delete_tag(&self, name: &str) -> Result<(Tag, i64)> {
        let result = self.store.write(|s| {
            let tag = s.resolve_tag(name)?;
            s.delete_tag(tag.id)
        })?;
        info!(tag_id = result.0.id, detached = result.1, "tag deleted");
        Ok(result)
    }
}

fn invalid_state(task: &Task, action: &'static str) -> Error {
    Error::InvalidState { id: task.id, status: task.status.to_string(), action }
}

fn resolve_tags(s: &Session<'_>, names: &[String]) -> Result<Vec<i64>> {
    names.iter().map(|name| s.resolve_tag(name).map(|t| t.id)).collect()
}
