//! Personal task tracking.
//!
//! This module provides:
//! - Tasks with title, description, priority, status, and a due date
//! - Categories (one per task, optional) and tags (many per task)
//! - A filter engine over AND-combined criteria, plus statistics
//! - A lifecycle service enforcing pending → in progress → completed
//! - JSON and CSV export/import
//!
//! # Example
//!
//! ```no_run
//! use todo_assistant::tasks::{NewTask, Priority, TaskQuery, TaskService};
//!
//! let service = TaskService::open("/tmp/todo.db").unwrap();
//!
//! let task = service
//!     .add_task(&NewTask { priority: Some(Priority::High), ..NewTask::titled("Write report") })
//!     .unwrap();
//! service.start_task(task.task.id).unwrap();
//!
//! let open = service.search(&TaskQuery { keyword: Some("report".into()), ..TaskQuery::all() });
//! ```

pub mod clock;
pub mod dates;
pub mod models;
pub mod query;
pub mod service;
pub mod store;
pub mod transfer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use models::{
    Category, InvalidPriority, InvalidStatus, Priority, Status, Tag, Task, TaskDetails, WithCount,
};
pub use query::{SortKey, TaskQuery, TaskStats};
pub use service::{NewTask, TaskChanges, TaskService};
pub use store::{CategoryRef, CategoryUpdate, SqliteTaskStore, TagUpdate};
pub use transfer::{ExportFormat, ImportOptions, ImportReport, TaskRecord};
