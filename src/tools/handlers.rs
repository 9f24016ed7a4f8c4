//! One function per tool: coerce arguments, delegate, shape the output.
//!
//! Business rules live in [`TaskService`]; nothing here re-checks them.

use super::inputs::{
    AddCategoryInput, AddTagInput, AddTaskInput, CategoryInput, ListTasksInput, NoInput,
    SearchTasksInput, TagInput, TaskIdInput, TaskTagInput, UpdateCategoryInput, UpdateTagInput,
    UpdateTaskInput,
};
use crate::error::Result;
use crate::tasks::dates::{parse_datetime, parse_with_edge, DayEdge};
use crate::tasks::{
    CategoryRef, CategoryUpdate, NewTask, Priority, SortKey, Status, TagUpdate, TaskChanges,
    TaskQuery, TaskService,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Default result limit for list/search operations to prevent oversized responses.
pub const DEFAULT_RESULT_LIMIT: usize = 50;

fn to_data<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Treat blank text as absent.
fn blank(text: &str) -> Option<&str> {
    Some(text.trim()).filter(|s| !s.is_empty())
}

/// Take one page of `items`, returning it with the count of all matches.
fn page<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> (Vec<T>, usize) {
    let total = items.len();
    let max = limit.unwrap_or(DEFAULT_RESULT_LIMIT);
    (items.into_iter().skip(offset).take(max).collect(), total)
}

/// Turn string criteria into a query. Pagination is left to the caller.
///
/// # Errors
///
/// Returns a validation error for unparseable dates, statuses, priorities or
/// sort keys.
pub fn build_query(input: &SearchTasksInput, now: DateTime<Utc>) -> Result<TaskQuery> {
    let date = |text: &Option<String>, edge: DayEdge| {
        text.as_deref().and_then(blank).map(|s| parse_with_edge(s, now, edge)).transpose()
    };
    Ok(TaskQuery {
        status: input.status.as_deref().and_then(blank).map(Status::from_str).transpose()?,
        priority: input.priority.as_deref().and_then(blank).map(Priority::from_str).transpose()?,
        category: input.category.as_deref().and_then(blank).map(CategoryRef::parse),
        no_category: input.no_category,
        tags: input.tags.clone(),
        no_tags: input.no_tags,
        keyword: input.keyword.as_deref().and_then(blank).map(ToString::to_string),
        created_after: date(&input.created_after, DayEdge::Start)?,
        created_before: date(&input.created_before, DayEdge::End)?,
        due_after: date(&input.due_after, DayEdge::Start)?,
        due_before: date(&input.due_before, DayEdge::End)?,
        completed_after: date(&input.completed_after, DayEdge::Start)?,
        completed_before: date(&input.completed_before, DayEdge::End)?,
        overdue: input.overdue,
        sort: input.sort_by.as_deref().map(SortKey::from_str).transpose()?.unwrap_or_default(),
        reverse: input.reverse,
        limit: None,
        offset: input.offset.unwrap_or(0),
    })
}

// === Task domain ===

pub(crate) fn current_datetime(service: &TaskService, _input: NoInput) -> Result<Value> {
    let now = service.now();
    Ok(json!({
        "now": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        "date": now.format("%Y-%m-%d").to_string(),
        "weekday": now.format("%A").to_string(),
        "timezone": "UTC",
    }))
}

pub(crate) fn add_task(service: &TaskService, input: AddTaskInput) -> Result<Value> {
    let now = service.now();
    let new = NewTask {
        title: input.title,
        description: input.description,
        priority: input.priority.as_deref().and_then(blank).map(Priority::from_str).transpose()?,
        category: input.category.as_deref().and_then(blank).map(CategoryRef::parse),
        tags: input.tags,
        due_at: input
            .due_date
            .as_deref()
            .and_then(blank)
            .map(|s| parse_datetime(s, now))
            .transpose()?,
    };
    to_data(&service.add_task(&new)?)
}

pub(crate) fn list_tasks(service: &TaskService, input: ListTasksInput) -> Result<Value> {
    search_tasks(service, input.into())
}

pub(crate) fn search_tasks(service: &TaskService, input: SearchTasksInput) -> Result<Value> {
    let query = build_query(&input, service.now())?;
    let (tasks, total) = page(service.search(&query.unpaged())?, query.offset, input.limit);
    Ok(json!({
        "showing": tasks.len(),
        "offset": query.offset,
        "total": total,
        "truncated": query.offset + tasks.len() < total,
        "tasks": tasks,
    }))
}

pub(crate) fn show_task(service: &TaskService, input: TaskIdInput) -> Result<Value> {
    to_data(&service.get_task(input.task_id)?)
}

pub(crate) fn update_task(service: &TaskService, input: UpdateTaskInput) -> Result<Value> {
    let now = service.now();
    let date = |text: &Option<String>| text.as_deref().map(|s| parse_datetime(s, now)).transpose();
    let changes = TaskChanges {
        created_at: date(&input.created_at)?,
        started_at: date(&input.started_at)?,
        completed_at: date(&input.completed_at)?,
        status: input.status.as_deref().map(Status::from_str).transpose()?,
        title: input.title,
        description: input.description.map(|d| Some(d).filter(|d| !d.trim().is_empty())),
        priority: input.priority.as_deref().map(Priority::from_str).transpose()?,
        category: input.category.map(|c| blank(&c).map(CategoryRef::parse)),
        due_at: input
            .due_date
            .map(|d| blank(&d).map(|s| parse_datetime(s, now)).transpose())
            .transpose()?,
        tags: input.tags,
    };
    to_data(&service.update_task(input.task_id, &changes)?)
}

pub(crate) fn start_task(service: &TaskService, input: TaskIdInput) -> Result<Value> {
    to_data(&service.start_task(input.task_id)?)
}

pub(crate) fn complete_task(service: &TaskService, input: TaskIdInput) -> Result<Value> {
    to_data(&service.complete_task(input.task_id)?)
}

pub(crate) fn delete_task(service: &TaskService, input: TaskIdInput) -> Result<Value> {
    let task = service.delete_task(input.task_id)?;
    Ok(json!({ "deleted": task }))
}

pub(crate) fn task_stats(service: &TaskService, input: SearchTasksInput) -> Result<Value> {
    let query = build_query(&input, service.now())?;
    to_data(&service.stats(&query.unpaged())?)
}

// === Category domain ===

pub(crate) fn add_category(service: &TaskService, input: AddCategoryInput) -> Result<Value> {
    let category = service.add_category(
        &input.name,
        input.description.as_deref().and_then(blank),
        input.color.as_deref().and_then(blank),
    )?;
    to_data(&category)
}

pub(crate) fn list_categories(service: &TaskService, _input: NoInput) -> Result<Value> {
    to_data(&service.list_categories()?)
}

pub(crate) fn update_category(service: &TaskService, input: UpdateCategoryInput) -> Result<Value> {
    let update = CategoryUpdate {
        name: input.name,
        description: input.description.map(|d| blank(&d).map(ToString::to_string)),
        color: input.color.map(|c| blank(&c).map(ToString::to_string)),
    };
    to_data(&service.update_category(&CategoryRef::parse(&input.category), &update)?)
}

pub(crate) fn delete_category(service: &TaskService, input: CategoryInput) -> Result<Value> {
    let (category, detached) = service.delete_category(&CategoryRef::parse(&input.category))?;
    Ok(json!({ "deleted": category, "tasks_uncategorized": detached }))
}

// === Tag domain ===

pub(crate) fn add_tag(service: &TaskService, input: AddTagInput) -> Result<Value> {
    to_data(&service.add_tag(&input.name, input.color.as_deref().and_then(blank))?)
}

pub(crate) fn list_tags(service: &TaskService, _input: NoInput) -> Result<Value> {
    to_data(&service.list_tags()?)
}

pub(crate) fn update_tag(service: &TaskService, input: UpdateTagInput) -> Result<Value> {
    let update = TagUpdate {
        name: input.name,
        color: input.color.map(|c| blank(&c).map(ToString::to_string)),
    };
    to_data(&service.update_tag(&input.tag, &update)?)
}

pub(crate) fn delete_tag(service: &TaskService, input: TagInput) -> Result<Value> {
    let (tag, detached) = service.delete_tag(&input.tag)?;
    Ok(json!({ "deleted": tag, "tasks_untagged": detached }))
}

pub(crate) fn tag_task(service: &TaskService, input: TaskTagInput) -> Result<Value> {
    to_data(&service.tag_task(input.task_id, &input.tag)?)
}

pub(crate) fn untag_task(service: &TaskService, input: TaskTagInput) -> Result<Value> {
    to_data(&service.untag_task(input.task_id, &input.tag)?)
}
