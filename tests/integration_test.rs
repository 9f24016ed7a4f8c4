//! Integration tests for `todo_assistant`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use todo_assistant::tasks::transfer;
use todo_assistant::tasks::{
    CategoryRef, ExportFormat, FixedClock, ImportOptions, NewTask, Priority, SqliteTaskStore,
    Status, TaskQuery, TaskService,
};
use todo_assistant::tools::{ToolDomain, ToolRegistry};
use todo_assistant::{ErrorKind, VERSION};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
}

fn create_service(dir: &TempDir, name: &str) -> (TaskService, Arc<FixedClock>) {
    let store = SqliteTaskStore::new(dir.path().join(name)).unwrap();
    let clock = Arc::new(FixedClock::new(start()));
    (TaskService::with_clock(store, clock.clone()), clock)
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[test]
fn test_create_then_fetch_returns_same_task() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    service.add_category("Work", None, None).unwrap();
    service.add_tag("urgent", None).unwrap();

    let created = service
        .add_task(&NewTask {
            description: Some("Quarterly numbers".into()),
            priority: Some(Priority::High),
            category: Some(CategoryRef::parse("Work")),
            tags: vec!["urgent".into()],
            due_at: Some(start() + Duration::days(1)),
            ..NewTask::titled("Write report")
        })
        .unwrap();

    assert_eq!(service.get_task(created.task.id).unwrap(), created);
    assert_eq!(created.task.status, Status::Pending);
    assert_eq!(created.tag_names(), vec!["urgent"]);
}

#[test]
fn test_lifecycle_scenario() {
    let dir = TempDir::new().unwrap();
    let (service, clock) = create_service(&dir, "todo.db");
    let task = service
        .add_task(&NewTask {
            priority: Some(Priority::High),
            due_at: Some(start() + Duration::days(1)),
            ..NewTask::titled("Write report")
        })
        .unwrap();
    let id = task.task.id;
    assert_eq!(task.task.status, Status::Pending);

    clock.advance(Duration::hours(1));
    let started = service.start_task(id).unwrap();
    assert_eq!(started.task.status, Status::InProgress);
    assert_eq!(started.task.started_at, Some(start() + Duration::hours(1)));

    let again = service.start_task(id).unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidState);

    clock.advance(Duration::hours(2));
    let done = service.complete_task(id).unwrap();
    assert_eq!(done.task.status, Status::Completed);
    assert_eq!(done.task.completed_at, Some(start() + Duration::hours(3)));
    assert_eq!(done.task.started_at, started.task.started_at);

    assert_eq!(service.complete_task(id).unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(service.start_task(id).unwrap_err().kind(), ErrorKind::InvalidState);
}

#[test]
fn test_deleting_category_uncategorizes_tasks() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    service.add_category("Home", None, None).unwrap();
    let task = service
        .add_task(&NewTask { category: Some(CategoryRef::parse("Home")), ..NewTask::titled("Fix sink") })
        .unwrap();

    service.delete_category(&CategoryRef::parse("Home")).unwrap();

    let after = service.get_task(task.task.id).unwrap();
    assert_eq!(after.category, None);
    assert_eq!(after.task.category_id, None);
    assert_eq!(after.task.title, task.task.title);
    assert_eq!(after.task.status, task.task.status);
    assert_eq!(after.task.priority, task.task.priority);
}

#[test]
fn test_tag_filter_is_an_intersection() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    service.add_tag("urgent", None).unwrap();
    service.add_tag("work", None).unwrap();
    let both = service
        .add_task(&NewTask { tags: vec!["urgent".into(), "work".into()], ..NewTask::titled("both") })
        .unwrap();
    service.add_task(&NewTask { tags: vec!["urgent".into()], ..NewTask::titled("urgent only") }).unwrap();
    service.add_task(&NewTask { tags: vec!["work".into()], ..NewTask::titled("work only") }).unwrap();

    let found = service
        .search(&TaskQuery { tags: vec!["urgent".into(), "work".into()], ..TaskQuery::all() })
        .unwrap();
    let ids: Vec<i64> = found.iter().map(|d| d.task.id).collect();
    assert_eq!(ids, vec![both.task.id]);
}

#[test]
fn test_overdue_matches_open_tasks_due_before_now() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    let due = |title: &str, offset: Duration| {
        service
            .add_task(&NewTask { due_at: Some(start() + offset), ..NewTask::titled(title) })
            .unwrap()
            .task
            .id
    };
    let late = due("late", -Duration::days(1));
    let late_started = due("late started", -Duration::hours(1));
    let late_done = due("late done", -Duration::days(2));
    due("due now", Duration::zero());
    due("future", Duration::days(1));
    service.add_task(&NewTask::titled("no due date")).unwrap();
    service.start_task(late_started).unwrap();
    service.complete_task(late_done).unwrap();

    let overdue = service.search(&TaskQuery { overdue: true, ..TaskQuery::all() }).unwrap();
    let mut ids: Vec<i64> = overdue.iter().map(|d| d.task.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![late, late_started]);
}

#[test]
fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let (source, clock) = create_service(&dir, "source.db");
    source.add_category("Work", Some("Day job"), Some("#336699")).unwrap();
    source.add_tag("urgent", None).unwrap();
    source.add_tag("q3", None).unwrap();
    let report = source
        .add_task(&NewTask {
            description: Some("Numbers, charts and \"quotes\"".into()),
            priority: Some(Priority::High),
            category: Some(CategoryRef::parse("Work")),
            tags: vec!["urgent".into(), "q3".into()],
            due_at: Some(start() + Duration::days(3)),
            ..NewTask::titled("Write report")
        })
        .unwrap();
    clock.advance(Duration::minutes(5));
    source.start_task(report.task.id).unwrap();
    let errand = source.add_task(&NewTask::titled("Buy milk")).unwrap();
    clock.advance(Duration::minutes(5));
    source.complete_task(errand.task.id).unwrap();

    for format in [ExportFormat::Json, ExportFormat::Csv] {
        let text = transfer::export(&source, &TaskQuery::all(), true, format).unwrap();
        let (target, _clock) = create_service(&dir, &format!("target-{format}.db"));
        let records = transfer::parse(&text, format, target.now()).unwrap();

        let rehearsal =
            transfer::import(&target, &records, ImportOptions { dry_run: true, ..ImportOptions::default() })
                .unwrap();
        assert_eq!(rehearsal.imported, 2);
        assert!(target.search(&TaskQuery::all()).unwrap().is_empty());
        assert!(target.list_tags().unwrap().is_empty());

        let imported = transfer::import(&target, &records, ImportOptions::default()).unwrap();
        assert_eq!(imported.imported, 2);
        assert_eq!(imported.categories_created, 1);
        assert_eq!(imported.tags_created, 2);

        let without_ids = |service: &TaskService| {
            let mut records = transfer::export_records(service, &TaskQuery::all(), true).unwrap();
            for record in &mut records {
                record.id = None;
            }
            records
        };
        assert_eq!(without_ids(&target), without_ids(&source), "format {format}");
    }
}

#[test]
fn test_tool_registry_envelopes() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    let registry = ToolRegistry::all(service);

    let added = registry.call("add_task", json!({"title": "Write report", "priority": "high", "due_date": "tomorrow"}));
    assert!(added.success, "{added:?}");
    let data = added.data.unwrap();
    assert_eq!(data["status"], "pending");
    assert_eq!(data["priority"], "high");
    let id = data["id"].as_i64().unwrap();

    let started = registry.call("start_task", json!({"task_id": id}));
    assert_eq!(started.data.unwrap()["status"], "in_progress");

    let twice = registry.call("start_task", json!({"task_id": id}));
    assert!(!twice.success);
    assert_eq!(twice.error_kind, Some(ErrorKind::InvalidState));
    assert!(twice.data.is_none());

    let missing = registry.call("show_task", json!({"task_id": 999}));
    assert_eq!(missing.error_kind, Some(ErrorKind::NotFound));

    let bad = registry.call("add_task", json!({"title": "x", "priority": "urgent"}));
    assert_eq!(bad.error_kind, Some(ErrorKind::Validation));

    let listed = registry.call("list_tasks", json!({}));
    assert_eq!(listed.data.unwrap()["total"], 1);
}

#[test]
fn test_registry_binds_only_requested_domains() {
    let dir = TempDir::new().unwrap();
    let (service, _clock) = create_service(&dir, "todo.db");
    let registry = ToolRegistry::for_domains(service, &[ToolDomain::Category]);

    assert!(registry.names().iter().all(|name| name.contains("categor")));
    assert!(registry.call("add_category", json!({"name": "Work"})).success);

    let blocked = registry.call("add_task", json!({"title": "Write report"}));
    assert!(!blocked.success);
    assert_eq!(blocked.error_kind, Some(ErrorKind::NotFound));
    assert!(registry.service().search(&TaskQuery::all()).unwrap().is_empty());
}
